//! Output rendering for list and describe style commands.
//!
//! Every renderable type implements [`Formatted`], which supplies the human
//! (and optionally plain and URL) renderings. The structured formats (JSON,
//! YAML, XML) come straight from the type's `Serialize` impl.

use std::fmt;
use std::io::Write;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FuncError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Plain,
    Json,
    Xml,
    Yaml,
    Url,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Human,
        OutputFormat::Plain,
        OutputFormat::Json,
        OutputFormat::Xml,
        OutputFormat::Yaml,
        OutputFormat::Url,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Human => "human",
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Url => "url",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can be printed in every [`OutputFormat`].
pub trait Formatted: Serialize {
    /// Root element name used for XML output.
    const XML_ROOT: &'static str;

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()>;

    fn plain(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.human(w)
    }

    /// Only things with an address (deployed instances) have a URL form.
    fn url(&self, _w: &mut dyn Write) -> Result<(), FuncError> {
        Err(FuncError::UnsupportedFormat {
            format: OutputFormat::Url,
            supported: "human, plain, json, xml, yaml".into(),
        })
    }

    fn xml(&self) -> Result<String, FuncError> {
        quick_xml::se::to_string_with_root(Self::XML_ROOT, self).map_err(|e| FuncError::Render {
            what: "xml",
            reason: e.to_string(),
        })
    }
}

/// Render `item` in `format` to `w`.
pub fn write<T: Formatted + ?Sized>(
    item: &T,
    format: OutputFormat,
    w: &mut dyn Write,
) -> Result<(), FuncError> {
    match format {
        OutputFormat::Human => item.human(w).map_err(io_error)?,
        OutputFormat::Plain => item.plain(w).map_err(io_error)?,
        OutputFormat::Url => item.url(w)?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).map_err(|e| FuncError::Render {
                what: "json",
                reason: e.to_string(),
            })?;
            writeln!(w, "{json}").map_err(io_error)?;
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(item).map_err(|e| FuncError::Render {
                what: "yaml",
                reason: e.to_string(),
            })?;
            write!(w, "{yaml}").map_err(io_error)?;
        }
        OutputFormat::Xml => {
            let xml = item.xml()?;
            writeln!(w, "{xml}").map_err(io_error)?;
        }
    }
    Ok(())
}

pub(crate) fn io_error(e: std::io::Error) -> FuncError {
    FuncError::Render {
        what: "output",
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    impl Formatted for Sample {
        const XML_ROOT: &'static str = "sample";

        fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "{} ({})", self.name, self.count)
        }
    }

    fn render(format: OutputFormat) -> Result<String, FuncError> {
        let sample = Sample {
            name: "alpha".into(),
            count: 2,
        };
        let mut buf = Vec::new();
        write(&sample, format, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[test]
    fn human_and_plain_share_a_default() {
        assert_eq!(render(OutputFormat::Human).unwrap(), "alpha (2)\n");
        assert_eq!(render(OutputFormat::Plain).unwrap(), "alpha (2)\n");
    }

    #[test]
    fn json_is_pretty_printed() {
        let out = render(OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["name"], "alpha");
        assert_eq!(parsed["count"], 2);
    }

    #[test]
    fn yaml_has_fields() {
        let out = render(OutputFormat::Yaml).unwrap();
        assert!(out.contains("name: alpha"));
        assert!(out.contains("count: 2"));
    }

    #[test]
    fn xml_uses_root_name() {
        let out = render(OutputFormat::Xml).unwrap();
        assert!(out.starts_with("<sample>"));
        assert!(out.contains("<name>alpha</name>"));
    }

    #[test]
    fn url_unsupported_by_default() {
        let err = render(OutputFormat::Url).unwrap_err();
        assert!(matches!(err, FuncError::UnsupportedFormat { .. }));
    }

    #[test]
    fn format_names_round_trip_through_clap() {
        for format in OutputFormat::ALL {
            let parsed = OutputFormat::from_str(format.as_str(), false).unwrap();
            assert_eq!(parsed, format);
        }
    }
}
