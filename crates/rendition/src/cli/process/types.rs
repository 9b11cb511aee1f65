//! CLI types for the process command: what to emit once an image is done.

use rendition_core::Processed;
use std::io::Write;

/// What the command writes for each processed image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Rendition byte sizes, then the sorted info (the default)
    Report,
    /// Nothing
    None,
    /// The checksum as text
    Checksum,
    /// The info mapping as JSON
    Info,
    /// The raw JPEG bytes of one configured size
    Size(String),
}

impl Response {
    /// Parse a `--response` value. Names are case-insensitive; size names
    /// must be among `sizes`.
    pub fn parse(value: Option<&str>, sizes: &[String]) -> anyhow::Result<Self> {
        let Some(value) = value else {
            return Ok(Response::Report);
        };
        let lowered = value.to_lowercase();
        match lowered.as_str() {
            "none" => Ok(Response::None),
            "checksum" => Ok(Response::Checksum),
            "info" => Ok(Response::Info),
            _ => sizes
                .iter()
                .find(|size| size.to_lowercase() == lowered)
                .map(|size| Response::Size(size.clone()))
                .ok_or_else(|| anyhow::anyhow!("Invalid response parameter: {value}")),
        }
    }

    /// Whether the output is binary and only makes sense for one image.
    pub fn is_binary(&self) -> bool {
        matches!(self, Response::Size(_))
    }

    /// Write the selected output for one image.
    pub fn write<W: Write>(&self, processed: &Processed, out: &mut W) -> anyhow::Result<()> {
        match self {
            Response::Report => write_report(processed, out)?,
            Response::None => {}
            Response::Checksum => writeln!(out, "{}", processed.checksum)?,
            Response::Info => {
                serde_json::to_writer_pretty(&mut *out, &processed.info)?;
                writeln!(out)?;
            }
            Response::Size(size) => {
                let bytes = processed
                    .results
                    .get(size)
                    .ok_or_else(|| anyhow::anyhow!("No rendition produced for size {size}"))?;
                out.write_all(bytes)?;
            }
        }
        Ok(())
    }
}

/// Rendition sizes, a blank line, then every info key in order.
fn write_report<W: Write>(processed: &Processed, out: &mut W) -> std::io::Result<()> {
    for (size, bytes) in &processed.results {
        writeln!(out, "{size}: {}", bytes.len())?;
    }
    writeln!(out)?;

    let info = &processed.info;
    let mut lines: Vec<(String, String)> = info
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if let Some(name) = &info.blob_info_name {
        lines.push(("blob_info_name".into(), name.clone()));
    }
    if !info.blob_names.is_empty() {
        let names = serde_json::to_string(&info.blob_names).unwrap_or_default();
        lines.push(("blob_names".into(), names));
    }
    lines.sort();
    for (key, value) in lines {
        writeln!(out, "{key}: {value}")?;
    }
    writeln!(out)
}
