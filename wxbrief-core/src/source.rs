//! Product source traits.
//!
//! The pipeline only sees these traits. Concrete sources (bundled samples,
//! live HTTP) live in the CLI crate.

use tracing::warn;

use crate::route::UpperWinds;
use crate::types::{RawProduct, Result, TextProduct, SOURCE_SAMPLE_FALLBACK};

/// METAR and TAF for a station.
pub trait MetarTafSource {
    fn fetch_metar(&self, ident: &str) -> Result<RawProduct>;
    fn fetch_taf(&self, ident: &str) -> Result<RawProduct>;
}

/// Line-oriented per-station text, such as NOTAMs.
pub trait TextSource {
    fn fetch(&self, ident: &str) -> Result<TextProduct>;
}

/// Area SIGMET lines.
pub trait SigmetSource {
    fn fetch(&self) -> Result<Vec<String>>;
}

/// Forecast upper winds and temperatures by level.
pub trait UpperWindsSource {
    fn fetch(&self) -> Result<UpperWinds>;
}

/// Tries `primary`, and on any error serves `fallback` relabelled
/// `SAMPLE_FALLBACK`.
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P: MetarTafSource, F: MetarTafSource> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        FallbackSource { primary, fallback }
    }

    fn with_fallback(
        &self,
        ident: &str,
        kind: &str,
        primary: Result<RawProduct>,
        fallback: impl FnOnce() -> Result<RawProduct>,
    ) -> Result<RawProduct> {
        match primary {
            Ok(product) => Ok(product),
            Err(e) => {
                warn!(ident, kind, error = %e, "live fetch failed, using sample");
                let mut product = fallback()?;
                product.source = SOURCE_SAMPLE_FALLBACK.into();
                Ok(product)
            }
        }
    }
}

impl<P: MetarTafSource, F: MetarTafSource> MetarTafSource for FallbackSource<P, F> {
    fn fetch_metar(&self, ident: &str) -> Result<RawProduct> {
        self.with_fallback(ident, "metar", self.primary.fetch_metar(ident), || {
            self.fallback.fetch_metar(ident)
        })
    }

    fn fetch_taf(&self, ident: &str) -> Result<RawProduct> {
        self.with_fallback(ident, "taf", self.primary.fetch_taf(ident), || {
            self.fallback.fetch_taf(ident)
        })
    }
}

impl<T: MetarTafSource + ?Sized> MetarTafSource for Box<T> {
    fn fetch_metar(&self, ident: &str) -> Result<RawProduct> {
        (**self).fetch_metar(ident)
    }

    fn fetch_taf(&self, ident: &str) -> Result<RawProduct> {
        (**self).fetch_taf(ident)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{BriefError, SOURCE_LIVE, SOURCE_SAMPLE};

    /// Serves fixed reports for any station.
    pub(crate) struct FixedSource {
        pub metar: String,
        pub taf: String,
        pub label: &'static str,
    }

    impl MetarTafSource for FixedSource {
        fn fetch_metar(&self, ident: &str) -> Result<RawProduct> {
            Ok(RawProduct::new(ident, &self.metar, self.label))
        }

        fn fetch_taf(&self, ident: &str) -> Result<RawProduct> {
            Ok(RawProduct::new(ident, &self.taf, self.label))
        }
    }

    struct DownSource;

    impl MetarTafSource for DownSource {
        fn fetch_metar(&self, _ident: &str) -> Result<RawProduct> {
            Err(BriefError::Source("connection refused".into()))
        }

        fn fetch_taf(&self, _ident: &str) -> Result<RawProduct> {
            Err(BriefError::Source("connection refused".into()))
        }
    }

    fn sample() -> FixedSource {
        FixedSource {
            metar: "FAOR 121000Z 00000KT CAVOK 20/10 Q1013".into(),
            taf: "TAF FAOR 121100Z 1212/1318 CAVOK".into(),
            label: SOURCE_SAMPLE,
        }
    }

    #[test]
    fn test_fallback_relabels_sample() {
        let source = FallbackSource::new(DownSource, sample());
        let metar = source.fetch_metar("FAOR").unwrap();
        assert_eq!(metar.source, SOURCE_SAMPLE_FALLBACK);
        assert!(metar.raw.starts_with("FAOR"));
        assert_eq!(source.fetch_taf("FAOR").unwrap().source, SOURCE_SAMPLE_FALLBACK);
    }

    #[test]
    fn test_primary_success_keeps_label() {
        let live = FixedSource {
            label: SOURCE_LIVE,
            ..sample()
        };
        let source = FallbackSource::new(live, DownSource);
        assert_eq!(source.fetch_metar("FAOR").unwrap().source, SOURCE_LIVE);
    }

    #[test]
    fn test_both_down_is_error() {
        let source = FallbackSource::new(DownSource, DownSource);
        assert!(source.fetch_metar("FAOR").is_err());
    }

    #[test]
    fn test_boxed_source() {
        let boxed: Box<dyn MetarTafSource> = Box::new(sample());
        assert_eq!(boxed.fetch_metar("FALA").unwrap().ident, "FALA");
    }
}
