use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::{Config, LogType};
use crate::error::ItemError;
use crate::output;
use crate::parsers::LogId;

/// How a conversion that did not fail outright went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Clean,
    /// The program exited non-zero; its output, if any, is used anyway.
    Warned,
}

/// Turns a raw record into a structured one.
pub trait Converter {
    fn convert(&self, input: &Path, output: &Path) -> Result<Conversion, ItemError>;
}

/// Runs `<program> <input> -o <output>` with absolute paths.
///
/// A non-zero exit is only logged; whatever the program left behind is used as is.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: PathBuf,
}

impl ExternalConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Converter for ExternalConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<Conversion, ItemError> {
        let input = std::path::absolute(input)?;
        let output = std::path::absolute(output)?;
        let status = Command::new(&self.program)
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .status()
            .map_err(|source| ItemError::Converter {
                program: self.program.display().to_string(),
                source,
            })?;

        if status.success() {
            info!(output = %output.display(), "converted");
            Ok(Conversion::Clean)
        } else {
            warn!(
                program = %self.program.display(),
                input = %input.display(),
                %status,
                "converter exited unsuccessfully, continuing"
            );
            Ok(Conversion::Warned)
        }
    }
}

/// Raw record is already structured; copy it over.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

impl Converter for PassthroughConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<Conversion, ItemError> {
        fs::copy(input, output)?;
        info!(output = %output.display(), "copied structured log");
        Ok(Conversion::Clean)
    }
}

/// Pick the conversion for a log type: json logs need none, xml logs need the external program.
pub fn for_log_type(log_type: LogType, program: Option<&Path>) -> Option<Box<dyn Converter>> {
    match log_type {
        LogType::Json => Some(Box::new(PassthroughConverter)),
        LogType::Xml => program.map(|p| Box::new(ExternalConverter::new(p)) as Box<dyn Converter>),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub path: PathBuf,
    pub conversion: Conversion,
}

/// Convert the raw record of `id` into `{output}/converted/`.
///
/// Any converted file from an earlier run is removed first, so what is left afterwards was
/// produced from the current raw record or is missing.
pub fn convert(converter: &dyn Converter, id: &LogId, config: &Config) -> Result<Converted, ItemError> {
    let input = output::raw_path(config, id);
    let target = output::converted_path(config, id);
    output::create_parent_dirs(&target)?;
    match fs::remove_file(&target) {
        Ok(()) => debug!(path = %target.display(), "removed previous converted record"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let conversion = converter.convert(&input, &target)?;
    Ok(Converted {
        path: target,
        conversion,
    })
}
