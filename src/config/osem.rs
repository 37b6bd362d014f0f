//! Configuration file parser for OSEM

fn deserialize_uom_opt<'d, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<&str>::deserialize(deserializer)?
        .map(str::parse::<T>)
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom_3d<'d, D, T>(deserializer: D) -> Result<(T, T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y, z) = <(&str, &str, &str)>::deserialize(deserializer)?;
    tr_tup_res((x.parse(), y.parse(), z.parse())).map_err(de::Error::custom)
}

/// Transpose 3-tuple of `Result`
///
/// `Ok` if all elements `Ok`; if any element is an `Err` return the first one.
fn tr_tup_res<O, E>((x,y,z): (Result<O, E>, Result<O, E>, Result<O, E>)) -> Result<(O, O, O), E> {
    Ok((x?, y?, z?))
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Number of OSEM iterations to perform
    pub iterations: usize,

    /// Number of OSEM subsets per iteration
    #[serde(default = "default_subsets")]
    pub subsets: usize,

    /// Execution path performing the arithmetic
    #[serde(default)]
    pub path: PathKind,

    /// Let the buffer-reuse path return before its work is done
    #[serde(default = "default_deferred")]
    pub deferred: bool,

    pub nvoxels: (usize, usize, usize),

    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub fov_size: (Length, Length, Length),

    /// Radius of the cylindrical FOV mask; defaults to the inscribed radius
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub mask_radius: Option<Length>,

    #[serde(default)]
    pub scanner: Scanner,

    /// Raw sinogram files; a phantom is simulated when absent
    pub input: Option<Input>,

    #[serde(default)]
    pub phantom: phantom::Params,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scanner {
    #[serde(default = "default_views")]
    pub views: usize,

    pub radial_bins: Option<usize>,

    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub bin_width: Option<Length>,
}

impl Default for Scanner {
    fn default() -> Self { Self { views: default_views(), radial_bins: None, bin_width: None } }
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub measured: PathBuf,
    pub attenuation: PathBuf,
    pub normalization: PathBuf,
    pub randoms: PathBuf,
    pub scatter: PathBuf,
}

impl Input {
    pub fn read(&self) -> crate::Result<RawData> {
        RawData::from_raw_files(&self.measured, &self.attenuation, &self.normalization, &self.randoms, &self.scatter)
    }
}

impl Config {

    pub fn fov(&self) -> FOV { FOV::new(self.fov_size, self.nvoxels) }

    pub fn mask(&self) -> FovMask {
        let fov = self.fov();
        fov.cylinder_mask(self.mask_radius.unwrap_or_else(|| fov.inscribed_radius()))
    }

    /// Reject settings which deserialize fine but describe no usable scanner
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |setting, requirement| Err(Error::InvalidSetting { setting, requirement });
        let Scanner { views, radial_bins, bin_width } = self.scanner;
        if views == 0                                       { return invalid("scanner.views"      , "must be positive") }
        if radial_bins == Some(0)                           { return invalid("scanner.radial_bins", "must be positive") }
        if bin_width.is_some_and(|w| !(mm_(w) > 0.0))       { return invalid("scanner.bin_width"  , "must be a positive length") }
        if self.mask_radius.is_some_and(|r| !(mm_(r) > 0.0)) { return invalid("mask_radius"        , "must be a positive length") }
        Ok(())
    }

    pub fn scanner(&self) -> ParallelBeam {
        let fov = self.fov();
        let Scanner { views, radial_bins, bin_width } = self.scanner;
        let mut scanner = match bin_width {
            Some(width) => ParallelBeam::with_bin_width(&fov, views, width),
            None        => ParallelBeam::covering(&fov, views),
        };
        if let Some(bins) = radial_bins { scanner.radial_bins = bins }
        scanner
    }
}

fn default_subsets () -> usize { 14 }
fn default_views   () -> usize { 84 }
fn default_deferred() -> bool  { true }

pub fn read_config_file(path: &Path) -> crate::Result<Config> {
    let config: String = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config)?;
    config.validate()?;
    Ok(config)
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use units::{Length, mm_};

use crate::{
    Error,
    execution::PathKind,
    fov::{FOV, FovMask},
    phantom,
    precompute::RawData,
    projector::ParallelBeam,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use units::{cm, mm};

    // ----- Test an example on-disk config file -----------------------------------------
    #[test]
    fn test_config_file() -> crate::Result<()> {
        let config = read_config_file("osem-config.toml".as_ref())?;
        assert_eq!(config.iterations, 4);
        assert_eq!(config.subsets, 14);
        assert_eq!(config.path, PathKind::BufferReuse);
        assert!(config.deferred);
        assert_eq!(config.nvoxels, (60, 60, 16));
        assert_eq!(config.fov_size, (mm(180.0), mm(180.0), mm(48.0)));
        assert_eq!(config.mask_radius, Some(mm(87.0)));
        assert_eq!(config.scanner.views, 84);
        assert_eq!(config.scanner.bin_width, Some(mm(3.0)));
        assert_eq!(config.input, None);
        assert_eq!(config.phantom.seed, 7);
        assert!(config.phantom.noise);
        Ok(())
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let result = read_config_file("no/such/file.toml".as_ref());
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    // ----- Some helpers to make the tests more concise ---------------------------------
    //  ---  Parse string as TOML  -------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }
    //  ---  Parse string as TOML, with explicit error reporting -------------------------
    fn parse_config(input: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(input)
    }
    //  ---  Macro for concise assertions about values of parsed fields ------------------
    macro_rules! check {
        ($type:ident($text:expr) fields: $($field:ident = $expected:expr);+$(;)?) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            $(assert_eq!(config.$field, $expected);)*
        }
    }

    const MINIMAL: &str = r#"
        iterations = 3
        nvoxels  = [10, 20, 30]
        fov_size = ["123 mm", "456 mm", "78 cm"]
    "#;

    // ----- Test defaults -------------------------------------------------------------
    #[test]
    fn config_defaults() {
        check!{Config(MINIMAL) fields:
               iterations  = 3;
               subsets     = 14;
               path        = PathKind::BufferReuse;
               deferred    = true;
               nvoxels     = (10, 20, 30);
               fov_size    = (mm(123.0), mm(456.0), cm(78.0));
               mask_radius = None;
               scanner     = Scanner::default();
               input       = None;
               phantom     = phantom::Params::default();
        }
    }

    #[test]
    fn config_path_and_subsets() {
        let text = format!("{MINIMAL}\nsubsets = 1\npath = \"immediate\"\ndeferred = false");
        let config = parse_config(&text).unwrap();
        assert_eq!(config.subsets, 1);
        assert_eq!(config.path, PathKind::Immediate);
        assert!(!config.deferred);
    }

    #[test]
    fn config_input_files() {
        let text = format!(r#"{MINIMAL}
            [input]
            measured      = "m.raw"
            attenuation   = "a.raw"
            normalization = "n.raw"
            randoms       = "r.raw"
            scatter       = "s.raw"
        "#);
        let input = parse_config(&text).unwrap().input.unwrap();
        assert_eq!(input.measured, PathBuf::from("m.raw"));
        assert_eq!(input.scatter , PathBuf::from("s.raw"));
    }

    #[test]
    fn scanner_overrides() {
        let text = format!("{MINIMAL}\n[scanner]\nviews = 10\nradial_bins = 99\nbin_width = \"2 mm\"");
        let config = parse_config(&text).unwrap();
        let scanner = config.scanner();
        assert_eq!(scanner.views, 10);
        assert_eq!(scanner.radial_bins, 99);
        assert_eq!(scanner.bin_width, mm(2.0));
    }

    // ----- Make sure that bad input is not accepted ----------------------------------
    #[test]
    fn config_reject_unknown_field() {
        let text = format!("{MINIMAL}\nunknown_field = 666");
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn config_reject_unknown_path() {
        let text = format!("{MINIMAL}\npath = \"warp-drive\"");
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn config_reject_missing_iterations() {
        assert!(parse_config("nvoxels = [1,1,1]\nfov_size = [\"1 mm\", \"1 mm\", \"1 mm\"]").is_err());
    }

    #[rstest]
    #[case("[scanner]\nviews = 0"           , "scanner.views")]
    #[case("[scanner]\nradial_bins = 0"     , "scanner.radial_bins")]
    #[case("[scanner]\nbin_width = \"0 mm\"" , "scanner.bin_width")]
    #[case("[scanner]\nbin_width = \"-3 mm\"", "scanner.bin_width")]
    #[case("mask_radius = \"0 cm\""         , "mask_radius")]
    fn config_reject_degenerate_scanner(#[case] extra: &str, #[case] expected: &str) {
        let text = format!("{MINIMAL}\n{extra}");
        let config = parse_config(&text).unwrap();
        match config.validate() {
            Err(crate::Error::InvalidSetting { setting, .. }) => assert_eq!(setting, expected),
            other => panic!("expected InvalidSetting, got {other:?}"),
        }
    }

    #[test]
    fn degenerate_file_is_rejected_on_reading() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.toml");
        fs::write(&path, format!("{MINIMAL}\n[scanner]\nbin_width = \"0 mm\""))?;
        assert!(matches!(read_config_file(&path), Err(crate::Error::InvalidSetting { .. })));
        Ok(())
    }

    #[test]
    fn config_reject_lengths_without_units() {
        let text = MINIMAL.replace("\"123 mm\"", "\"123\"");
        assert!(parse_config(&text).is_err());
    }
}
