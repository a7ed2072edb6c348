//! wxbrief: airfield weather briefs from the command line.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Table};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wxbrief_core::config::select_profile;
use wxbrief_core::history::HistoryStore;
use wxbrief_core::notam::decode_sigmet;
use wxbrief_core::source::{FallbackSource, MetarTafSource, SigmetSource, UpperWindsSource};
use wxbrief_core::sun::format_hhmm;
use wxbrief_core::*;

mod db;
mod sources;

use sources::{
    LiveMetarTafSource, SampleMetarTafSource, SampleNotamSource, SampleSigmetSource,
    SampleUpperWindsSource,
};

#[derive(Parser)]
#[command(name = "wxbrief", version, about = "Airfield weather brief for training flights")]
struct Cli {
    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Bundled sample files only
    Sample,
    /// aviationweather.gov, falling back to samples
    Live,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single raw report and print it as JSON
    Decode {
        #[command(subcommand)]
        product: Product,
    },

    /// Evaluate every aerodrome (or the listed ones) and all routes
    Brief {
        /// Aerodrome idents to brief; all when empty
        idents: Vec<String>,

        /// Directory holding profiles.yaml, aerodromes.yaml, routes.yaml and samples/
        #[arg(long, env = "WXBRIEF_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Product source
        #[arg(long, value_enum, default_value = "sample")]
        mode: Mode,

        /// Pilot profile name; defaults to the PPL tier
        #[arg(long)]
        profile: Option<String>,

        /// SQLite history database path
        #[arg(long, env = "WXBRIEF_DB", default_value = "data/history.db")]
        db_path: String,

        /// Read history but do not record this cycle
        #[arg(long)]
        no_history: bool,

        /// Print the full brief as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show stored observation history
    History {
        /// Station ident; lists stations when omitted
        ident: Option<String>,

        /// SQLite history database path
        #[arg(long, env = "WXBRIEF_DB", default_value = "data/history.db")]
        db_path: String,

        /// Number of most recent snapshots to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum Product {
    /// Decode a METAR
    Metar { raw: String },
    /// Decode a TAF
    Taf { raw: String },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Decode { product } => cmd_decode(product),
        Commands::Brief {
            idents,
            data_dir,
            mode,
            profile,
            db_path,
            no_history,
            json,
        } => cmd_brief(&BriefArgs {
            idents,
            data_dir,
            mode,
            profile,
            db_path,
            record_history: !no_history,
            json,
        }),
        Commands::History {
            ident,
            db_path,
            limit,
        } => cmd_history(ident.as_deref(), &db_path, limit),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn open_db(db_path: &str) -> Result<db::Database> {
    db::Database::open(db_path).map_err(|e| BriefError::Store(format!("{db_path}: {e}")))
}

fn cmd_decode(product: Product) -> Result<()> {
    let value = match product {
        Product::Metar { raw } => serde_json::to_value(decode_metar(&raw, Utc::now()))?,
        Product::Taf { raw } => serde_json::to_value(decode_taf(&raw))?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Brief
// ---------------------------------------------------------------------------

struct BriefArgs {
    idents: Vec<String>,
    data_dir: PathBuf,
    mode: Mode,
    profile: Option<String>,
    db_path: String,
    record_history: bool,
    json: bool,
}

fn metar_taf_source(mode: Mode, data_dir: &Path) -> Result<Box<dyn MetarTafSource>> {
    let samples = SampleMetarTafSource::new(data_dir);
    Ok(match mode {
        Mode::Sample => Box::new(samples),
        Mode::Live => Box::new(FallbackSource::new(LiveMetarTafSource::new()?, samples)),
    })
}

fn cmd_brief(args: &BriefArgs) -> Result<()> {
    let pack = DataPack::load(&args.data_dir)?;
    let profile = select_profile(&pack.profiles, args.profile.as_deref())?;

    let stations = pack.select_stations(&args.idents)?;

    let metar_taf = metar_taf_source(args.mode, &args.data_dir)?;
    let notams = SampleNotamSource::new(&args.data_dir);
    let mut database = open_db(&args.db_path)?;
    let now = Utc::now();

    info!(
        stations = stations.len(),
        profile = %profile.name,
        record_history = args.record_history,
        "briefing"
    );

    let mut briefs = Vec::with_capacity(stations.len());
    for station in stations {
        briefs.push(fetch_and_evaluate(
            station,
            metar_taf.as_ref(),
            &notams,
            profile,
            &mut database,
            now,
            args.record_history,
        )?);
    }

    let sigmets = decode_sigmet(&SampleSigmetSource::new(&args.data_dir).fetch()?);
    let upper_winds = SampleUpperWindsSource::new(&args.data_dir).fetch()?;
    let routes: Vec<RouteBrief> = pack
        .routes
        .iter()
        .map(|route| evaluate_route(route, &briefs, &sigmets, &upper_winds, profile, now))
        .collect();

    if args.json {
        let out = json!({
            "generated_at_utc": now.to_rfc3339(),
            "profile": profile.name,
            "licence_tier": profile.licence_tier,
            "stations": briefs,
            "routes": routes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_stations(&briefs, &profile.name, now);
        print_routes(&routes);
    }
    Ok(())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or("-".into())
}

fn print_stations(briefs: &[StationBrief], profile: &str, now: DateTime<Utc>) {
    println!();
    println!("Brief at {} UTC, profile {profile}", now.format("%Y-%m-%d %H:%M"));
    println!();

    let mut table = Table::new();
    table.set_header(vec![
        "Ident", "Source", "Wind", "Vis (m)", "Ceiling (ft)", "QNH", "DA (ft)", "Sunset",
        "TAF (h)", "Severity", "Summary", "Workload", "Stability",
    ]);

    for b in briefs {
        let m = &b.metar;
        let wind = match (m.wind_dir_deg, m.wind_speed_kt, m.gust_kt) {
            (dir, Some(speed), Some(gust)) => format!("{}/{speed}G{gust}", opt(dir)),
            (dir, Some(speed), None) => format!("{}/{speed}", opt(dir)),
            _ => "-".into(),
        };
        table.add_row(vec![
            Cell::new(&b.ident),
            Cell::new(&b.metar_source),
            Cell::new(wind),
            Cell::new(opt(m.visibility_m)),
            Cell::new(opt(b.ceiling_ft_est)),
            Cell::new(opt(m.qnh_hpa)),
            Cell::new(opt(b.density_altitude.da_ft)),
            Cell::new(format_hhmm(b.sun.sunset)),
            Cell::new(
                b.taf_time_to_expiry
                    .hours
                    .map(|h| format!("{h:.1}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(b.severity),
            Cell::new(b.summary),
            Cell::new(format!("{:.0} {:?}", b.workload.score, b.workload.category)),
            Cell::new(format!("{:.0} {:?}", b.stability.score, b.stability.category)),
        ]);
    }

    println!("{table}");
}

fn print_routes(routes: &[RouteBrief]) {
    if routes.is_empty() {
        return;
    }
    println!();
    let mut table = Table::new();
    table.set_header(vec![
        "Route", "Track", "Dist (nm)", "Freezing (ft)", "SIGMETs", "Severity", "Summary",
    ]);
    for r in routes {
        table.add_row(vec![
            Cell::new(&r.route_id),
            Cell::new(r.track_deg.map(|t| format!("{t:.0}")).unwrap_or("-".into())),
            Cell::new(r.distance_nm.map(|d| format!("{d:.0}")).unwrap_or("-".into())),
            Cell::new(opt(r.freezing_level_ft)),
            Cell::new(r.sigmet_lines.len()),
            Cell::new(r.severity),
            Cell::new(r.summary),
        ]);
    }
    println!("{table}");
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

fn cmd_history(ident: Option<&str>, db_path: &str, limit: usize) -> Result<()> {
    let database = open_db(db_path)?;

    let Some(ident) = ident else {
        let counts = database
            .station_counts()
            .map_err(|e| BriefError::Store(e.to_string()))?;
        println!();
        println!("Database: {db_path}");
        println!();
        for c in counts {
            println!("  {:<6} {} snapshots", c.ident, c.snapshots);
        }
        println!();
        return Ok(());
    };

    let series = database.load(ident)?;
    if series.is_empty() {
        println!("No history for {ident}");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Time (UTC)", "Wind", "QNH", "Temp", "Dew", "Vis (m)", "Ceiling (ft)",
    ]);
    let skip = series.len().saturating_sub(limit);
    for s in series.entries().iter().skip(skip) {
        table.add_row(vec![
            Cell::new(
                s.timestamp
                    .map(|t| t.format("%d %H:%MZ").to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(format!("{}/{}", opt(s.wind_dir_deg), opt(s.wind_speed_kt))),
            Cell::new(opt(s.qnh_hpa)),
            Cell::new(opt(s.temp_c)),
            Cell::new(opt(s.dewpoint_c)),
            Cell::new(opt(s.visibility_m)),
            Cell::new(opt(s.ceiling_ft_est)),
        ]);
    }
    println!("{table}");
    Ok(())
}
