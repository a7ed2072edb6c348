//! Concrete product sources: bundled sample files and live HTTP.
//!
//! Sample layout under the data directory:
//! `samples/metar/IDENT.txt`, `samples/taf/IDENT.txt`, `samples/notam/IDENT.txt`,
//! `samples/sigmet/sigmet.txt`, `samples/winds_temps/winds_temps.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use wxbrief_core::route::UpperWinds;
use wxbrief_core::source::{MetarTafSource, SigmetSource, TextSource, UpperWindsSource};
use wxbrief_core::types::{non_blank_lines, SOURCE_LIVE, SOURCE_SAMPLE};
use wxbrief_core::{BriefError, RawProduct, Result, TextProduct};

const SAMPLES_DIR: &str = "samples";
const METAR_URL: &str = "https://aviationweather.gov/api/data/metar";
const TAF_URL: &str = "https://aviationweather.gov/api/data/taf";
const NOAA_METAR_URL: &str = "https://tgftp.nws.noaa.gov/data/observations/metar/stations";
const NOAA_TAF_URL: &str = "https://tgftp.nws.noaa.gov/data/forecasts/taf/stations";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("wxbrief/", env!("CARGO_PKG_VERSION"));

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// METAR and TAF from per-station sample files.
pub struct SampleMetarTafSource {
    metar_dir: PathBuf,
    taf_dir: PathBuf,
}

impl SampleMetarTafSource {
    pub fn new(data_dir: &Path) -> Self {
        let samples = data_dir.join(SAMPLES_DIR);
        SampleMetarTafSource {
            metar_dir: samples.join("metar"),
            taf_dir: samples.join("taf"),
        }
    }
}

/// Calm, clear report served when a station has no METAR sample.
pub fn placeholder_metar(ident: &str) -> String {
    format!("{ident} 010000Z 00000KT CAVOK 20/10 Q1013 NOSIG")
}

impl MetarTafSource for SampleMetarTafSource {
    fn fetch_metar(&self, ident: &str) -> Result<RawProduct> {
        let path = self.metar_dir.join(format!("{ident}.txt"));
        let raw = read_optional(&path)?.unwrap_or_else(|| {
            debug!(ident, "no METAR sample, using placeholder");
            placeholder_metar(ident)
        });
        Ok(RawProduct::new(ident, &raw, SOURCE_SAMPLE))
    }

    fn fetch_taf(&self, ident: &str) -> Result<RawProduct> {
        let path = self.taf_dir.join(format!("{ident}.txt"));
        let raw = read_optional(&path)?.unwrap_or_default();
        Ok(RawProduct::new(ident, &raw, SOURCE_SAMPLE))
    }
}

/// NOTAM lines from per-station sample files. A missing file is an error.
pub struct SampleNotamSource {
    dir: PathBuf,
}

impl SampleNotamSource {
    pub fn new(data_dir: &Path) -> Self {
        SampleNotamSource {
            dir: data_dir.join(SAMPLES_DIR).join("notam"),
        }
    }
}

impl TextSource for SampleNotamSource {
    fn fetch(&self, ident: &str) -> Result<TextProduct> {
        let path = self.dir.join(format!("{ident}.txt"));
        let text = std::fs::read_to_string(&path)
            .map_err(|e| BriefError::Source(format!("{}: {e}", path.display())))?;
        Ok(TextProduct::from_text(ident, &text, SOURCE_SAMPLE))
    }
}

/// Area SIGMET lines from one sample file. A missing file means none in force.
pub struct SampleSigmetSource {
    path: PathBuf,
}

impl SampleSigmetSource {
    pub fn new(data_dir: &Path) -> Self {
        SampleSigmetSource {
            path: data_dir.join(SAMPLES_DIR).join("sigmet").join("sigmet.txt"),
        }
    }
}

impl SigmetSource for SampleSigmetSource {
    fn fetch(&self) -> Result<Vec<String>> {
        Ok(read_optional(&self.path)?
            .map(|text| non_blank_lines(&text))
            .unwrap_or_default())
    }
}

/// Upper winds from a JSON sample: `{"levels": [{level_ft, wind_dir_deg, ...}]}`.
pub struct SampleUpperWindsSource {
    path: PathBuf,
}

impl SampleUpperWindsSource {
    pub fn new(data_dir: &Path) -> Self {
        SampleUpperWindsSource {
            path: data_dir.join(SAMPLES_DIR).join("winds_temps").join("winds_temps.json"),
        }
    }
}

impl UpperWindsSource for SampleUpperWindsSource {
    fn fetch(&self) -> Result<UpperWinds> {
        match read_optional(&self.path)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(UpperWinds::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Live
// ---------------------------------------------------------------------------

/// Raw METAR/TAF from aviationweather.gov, with the NOAA station files as a
/// second chance when the API has nothing.
pub struct LiveMetarTafSource {
    client: reqwest::blocking::Client,
}

impl LiveMetarTafSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BriefError::Source(e.to_string()))?;
        Ok(LiveMetarTafSource { client })
    }

    fn get_text(&self, request: reqwest::blocking::RequestBuilder, ident: &str) -> Result<String> {
        request
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| BriefError::Source(format!("{ident}: {e}")))
    }

    fn fetch_raw(&self, api_url: &str, noaa_url: &str, ident: &str) -> Result<String> {
        let request = self
            .client
            .get(api_url)
            .query(&[("ids", ident), ("format", "raw")]);
        if let Some(report) = first_report(&self.get_text(request, ident)?) {
            return Ok(report);
        }
        debug!(ident, "empty API response, trying NOAA station file");
        let station_file = format!("{noaa_url}/{}.TXT", ident.to_ascii_uppercase());
        let text = self.get_text(self.client.get(station_file), ident)?;
        last_report(&text).ok_or_else(|| BriefError::Source(format!("{ident}: empty response")))
    }
}

/// First non-blank line of a raw response.
fn first_report(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Last non-blank line of a NOAA station file. The first line is the
/// issue timestamp.
fn last_report(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

impl MetarTafSource for LiveMetarTafSource {
    fn fetch_metar(&self, ident: &str) -> Result<RawProduct> {
        let raw = self.fetch_raw(METAR_URL, NOAA_METAR_URL, ident)?;
        Ok(RawProduct::new(ident, &raw, SOURCE_LIVE))
    }

    fn fetch_taf(&self, ident: &str) -> Result<RawProduct> {
        let raw = self.fetch_raw(TAF_URL, NOAA_TAF_URL, ident)?;
        Ok(RawProduct::new(ident, &raw, SOURCE_LIVE))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join(SAMPLES_DIR);
        for sub in ["metar", "taf", "notam", "sigmet", "winds_temps"] {
            fs::create_dir_all(samples.join(sub)).unwrap();
        }
        fs::write(samples.join("metar/FAOR.txt"), "FAOR 121000Z 03004KT 9999 FEW040 12/02 Q1025\n").unwrap();
        fs::write(samples.join("taf/FAOR.txt"), "TAF FAOR 121100Z 1212/1318 03005KT CAVOK\n").unwrap();
        fs::write(samples.join("notam/FAOR.txt"), "A0123/26 RWY 03L WET\n\nA0124/26 TWY B WIP\n").unwrap();
        dir
    }

    #[test]
    fn test_sample_metar_taf() {
        let dir = data_dir();
        let source = SampleMetarTafSource::new(dir.path());
        let metar = source.fetch_metar("FAOR").unwrap();
        assert_eq!(metar.raw, "FAOR 121000Z 03004KT 9999 FEW040 12/02 Q1025");
        assert_eq!(metar.source, SOURCE_SAMPLE);
        assert!(source.fetch_taf("FAOR").unwrap().raw.starts_with("TAF FAOR"));
    }

    #[test]
    fn test_missing_samples() {
        let dir = data_dir();
        let source = SampleMetarTafSource::new(dir.path());
        assert_eq!(source.fetch_metar("FALA").unwrap().raw, placeholder_metar("FALA"));
        assert_eq!(source.fetch_taf("FALA").unwrap().raw, "");
        assert!(SampleNotamSource::new(dir.path()).fetch("FALA").is_err());
    }

    #[test]
    fn test_sample_notams() {
        let dir = data_dir();
        let notams = SampleNotamSource::new(dir.path()).fetch("FAOR").unwrap();
        assert_eq!(notams.lines, vec!["A0123/26 RWY 03L WET", "A0124/26 TWY B WIP"]);
    }

    #[test]
    fn test_sample_sigmets() {
        let dir = data_dir();
        let source = SampleSigmetSource::new(dir.path());
        assert!(source.fetch().unwrap().is_empty());
        fs::write(
            dir.path().join("samples/sigmet/sigmet.txt"),
            "FAJA SIGMET A1 VALID 121000/121400 EMBD TS OBS\n\nFAJA SIGMET B2 SEV TURB FCST\n",
        )
        .unwrap();
        assert_eq!(source.fetch().unwrap().len(), 2);
    }

    #[test]
    fn test_sample_upper_winds() {
        let dir = data_dir();
        let source = SampleUpperWindsSource::new(dir.path());
        assert!(source.fetch().unwrap().levels.is_empty());
        fs::write(
            dir.path().join("samples/winds_temps/winds_temps.json"),
            r#"{"levels": [{"level_ft": 9500, "wind_dir_deg": 280, "wind_speed_kt": 25, "temp_c": -2}]}"#,
        )
        .unwrap();
        let winds = source.fetch().unwrap();
        assert_eq!(winds.freezing_level_ft(), Some(9500));

        fs::write(dir.path().join("samples/winds_temps/winds_temps.json"), "not json").unwrap();
        assert!(matches!(source.fetch(), Err(BriefError::Json(_))));
    }

    #[test]
    fn test_bundled_data_briefs() {
        use wxbrief_core::config::select_profile;
        use wxbrief_core::notam::decode_sigmet;
        use wxbrief_core::{evaluate_route, fetch_and_evaluate, DataPack, MemoryHistoryStore};

        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data");
        let pack = DataPack::load(&dir).unwrap();
        let profile = select_profile(&pack.profiles, None).unwrap();
        assert_eq!(profile.licence_tier, "PPL");

        let metar_taf = SampleMetarTafSource::new(&dir);
        let notams = SampleNotamSource::new(&dir);
        let mut store = MemoryHistoryStore::new();
        let now = chrono::Utc::now();
        let briefs: Vec<_> = pack
            .aerodromes
            .iter()
            .map(|s| fetch_and_evaluate(s, &metar_taf, &notams, profile, &mut store, now, true).unwrap())
            .collect();
        assert_eq!(briefs.len(), pack.aerodromes.len());

        let sigmets = decode_sigmet(&SampleSigmetSource::new(&dir).fetch().unwrap());
        let winds = SampleUpperWindsSource::new(&dir).fetch().unwrap();
        for route in &pack.routes {
            let brief = evaluate_route(route, &briefs, &sigmets, &winds, profile, now);
            assert!(brief.track_deg.is_some(), "{}", route.route_id);
        }
    }

    #[test]
    fn test_first_report() {
        assert_eq!(
            first_report("\n  FAOR 121000Z 03004KT\nFAOR 120930Z 02003KT\n").as_deref(),
            Some("FAOR 121000Z 03004KT")
        );
        assert_eq!(first_report("  \n"), None);
    }

    #[test]
    fn test_last_report() {
        let station_file = "2026/02/12 10:00\nFAOR 121000Z 03004KT 9999 FEW040 12/02 Q1025\n\n";
        assert_eq!(
            last_report(station_file).as_deref(),
            Some("FAOR 121000Z 03004KT 9999 FEW040 12/02 Q1025")
        );
        assert_eq!(last_report(""), None);
    }
}
