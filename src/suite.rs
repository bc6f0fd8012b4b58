//! Batch driver: finds spec files, compiles them into Python test modules on disk, skips
//! outputs that are already current, removes outputs on request and runs the results.
//!
//! The parser and generator never touch the filesystem; everything here wraps them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::digest::Output;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::codegen::{CodeGenerator, FileHeader, GeneratorOptions};
use crate::config::Config;
use crate::errors::{CarinataError, SourceContext};
use crate::parser::parse_seeded;

// =====================
// Spec files
// =====================

/// A spec file and the input directory it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFile {
    pub root: PathBuf,
    pub path: PathBuf,
}

impl SpecFile {
    /// Where the generated module goes: the spec's path relative to its input directory,
    /// re-rooted under `output_root`, with a `.py` extension.
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        let relative = match self.path.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            // the spec was passed directly rather than found under a directory
            _ => Path::new(self.path.file_name().unwrap_or_default()),
        };
        output_root.join(relative).with_extension("py")
    }
}

/// Recursively scans `dirs` for files with the given extension.
///
/// The returned list is sorted so that runs are deterministic.
pub fn discover_spec_files(dirs: &[PathBuf], extension: &str) -> Result<Vec<SpecFile>, CarinataError> {
    let mut files = Vec::new();
    for dir in dirs {
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| CarinataError::io(dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == extension) {
                continue;
            }
            files.push(SpecFile {
                root: dir.clone(),
                path: path.to_path_buf(),
            });
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

// =====================
// Compilation
// =====================

pub type Fingerprint = Output<Sha256>;

/// SHA-256 over the spec source and the settings that shape the output.
pub fn fingerprint(source: &str, options: &GeneratorOptions) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(options.base_class.as_bytes());
    hasher.update([0u8, u8::from(options.line_markers)]);
    hasher.finalize()
}

/// Seed for the before/after suffix generator, so suffixes follow the fingerprint.
pub fn suffix_seed(digest: &Fingerprint) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(digest);
    seed
}

/// Compiles one spec source into a stamped Python module.
///
/// Suffixes are seeded from the fingerprint, so the same input always yields the same text.
pub fn compile_source(
    source: SourceContext,
    source_path: &str,
    options: &GeneratorOptions,
) -> Result<String, CarinataError> {
    let digest = fingerprint(&source.content, options);
    let tree = parse_seeded(source.clone(), suffix_seed(&digest))?;
    let options = GeneratorOptions {
        header: Some(FileHeader {
            hash: Some(format!("{:x}", digest)),
            source_path: source_path.to_string(),
        }),
        ..options.clone()
    };
    CodeGenerator::with_source(&tree, options, source).generate()
}

/// Reads and compiles a spec file.
pub fn compile_file(path: &Path, options: &GeneratorOptions) -> Result<String, CarinataError> {
    let content = fs::read_to_string(path).map_err(|e| CarinataError::io(path, e))?;
    compile_contents(path, content, options)
}

/// Diagnostics name the file as given; the generated header records its absolute path.
fn compile_contents(
    path: &Path,
    content: String,
    options: &GeneratorOptions,
) -> Result<String, CarinataError> {
    let display = path.display().to_string();
    let absolute = fs::canonicalize(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| display.clone());
    compile_source(SourceContext::from_file(display, content), &absolute, options)
}

// =====================
// Batch operations
// =====================

/// What happened to one spec file.
#[derive(Debug)]
pub enum Outcome {
    Generated(PathBuf),
    /// Output already carried the current fingerprint.
    Unchanged(PathBuf),
    Removed(PathBuf),
    /// `clean` found nothing to remove.
    Absent(PathBuf),
    Failed(CarinataError),
}

#[derive(Debug)]
pub struct FileReport {
    pub spec: PathBuf,
    pub outcome: Outcome,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    /// The generated module, when there is one on disk.
    pub fn output(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Generated(path) | Outcome::Unchanged(path) => Some(path),
            _ => None,
        }
    }
}

/// Comparison of an output file with what would be generated now.
#[derive(Debug)]
pub enum Freshness {
    Current,
    Missing { expected: String },
    Stale { existing: String, expected: String },
}

#[derive(Debug)]
pub struct CheckReport {
    pub spec: PathBuf,
    pub output: PathBuf,
    pub result: Result<Freshness, CarinataError>,
}

pub struct SuiteGenerator {
    config: Config,
    force: bool,
}

impl SuiteGenerator {
    pub fn new(config: Config, force: bool) -> Self {
        Self { config, force }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compiles every spec file under `dirs`. A failing file is reported and the rest still run.
    pub fn generate(&self, dirs: &[PathBuf]) -> Result<Vec<FileReport>, CarinataError> {
        let output_root = self.config.output_root();
        let options = self.config.generator_options();
        let specs = discover_spec_files(dirs, &self.config.extension)?;
        tracing::info!(count = specs.len(), output = %output_root.display(), "generating specs");

        Ok(specs
            .into_iter()
            .map(|spec| {
                let outcome = self
                    .generate_one(&spec, &output_root, &options)
                    .unwrap_or_else(|error| {
                        tracing::warn!(spec = %spec.path.display(), %error, "spec failed");
                        Outcome::Failed(error)
                    });
                FileReport {
                    spec: spec.path,
                    outcome,
                }
            })
            .collect())
    }

    fn generate_one(
        &self,
        spec: &SpecFile,
        output_root: &Path,
        options: &GeneratorOptions,
    ) -> Result<Outcome, CarinataError> {
        let output = spec.output_path(output_root);
        let content = fs::read_to_string(&spec.path).map_err(|e| CarinataError::io(&spec.path, e))?;

        if !self.force && is_current(&output, &content, options) {
            tracing::debug!(output = %output.display(), "output is current, skipping");
            return Ok(Outcome::Unchanged(output));
        }

        let generated = compile_contents(&spec.path, content, options)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| CarinataError::io(parent, e))?;
        }
        fs::write(&output, generated).map_err(|e| CarinataError::io(&output, e))?;
        tracing::info!(spec = %spec.path.display(), output = %output.display(), "generated");
        Ok(Outcome::Generated(output))
    }

    /// Removes the outputs `generate` would write for `dirs`.
    pub fn clean(&self, dirs: &[PathBuf]) -> Result<Vec<FileReport>, CarinataError> {
        let output_root = self.config.output_root();
        let specs = discover_spec_files(dirs, &self.config.extension)?;
        Ok(specs
            .into_iter()
            .map(|spec| {
                let output = spec.output_path(&output_root);
                let outcome = if !output.exists() {
                    Outcome::Absent(output)
                } else {
                    match fs::remove_file(&output) {
                        Ok(()) => {
                            tracing::info!(output = %output.display(), "removed");
                            Outcome::Removed(output)
                        }
                        Err(e) => Outcome::Failed(CarinataError::io(&output, e)),
                    }
                };
                FileReport {
                    spec: spec.path,
                    outcome,
                }
            })
            .collect())
    }

    /// Compares every output with a fresh compilation without writing anything.
    pub fn check(&self, dirs: &[PathBuf]) -> Result<Vec<CheckReport>, CarinataError> {
        let output_root = self.config.output_root();
        let options = self.config.generator_options();
        let specs = discover_spec_files(dirs, &self.config.extension)?;
        Ok(specs
            .into_iter()
            .map(|spec| {
                let output = spec.output_path(&output_root);
                let result = compile_file(&spec.path, &options).map(|expected| {
                    match fs::read_to_string(&output) {
                        Ok(existing) if existing == expected => Freshness::Current,
                        Ok(existing) => Freshness::Stale { existing, expected },
                        Err(_) => Freshness::Missing { expected },
                    }
                });
                CheckReport {
                    spec: spec.path,
                    output,
                    result,
                }
            })
            .collect())
    }

    /// Executes one generated module with the configured interpreter.
    ///
    /// Returns whether the tests passed.
    pub fn run_file(&self, path: &Path) -> Result<bool, CarinataError> {
        tracing::info!(interpreter = %self.config.interpreter, module = %path.display(), "running");
        let status = Command::new(&self.config.interpreter)
            .arg(path)
            .status()
            .map_err(|e| CarinataError::io(Path::new(&self.config.interpreter), e))?;
        Ok(status.success())
    }
}

/// True when `output` exists and its first line carries the fingerprint of `content`.
fn is_current(output: &Path, content: &str, options: &GeneratorOptions) -> bool {
    let Ok(existing) = fs::read_to_string(output) else {
        return false;
    };
    let expected = format!("{:x}", fingerprint(content, options));
    FileHeader::read_hash(&existing) == Some(expected.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_mirrors_input_layout() {
        let spec = SpecFile {
            root: PathBuf::from("specs"),
            path: PathBuf::from("specs/math/calc.carinata"),
        };
        assert_eq!(
            spec.output_path(Path::new("out")),
            PathBuf::from("out/math/calc.py")
        );
    }

    #[test]
    fn output_path_for_spec_passed_directly() {
        let spec = SpecFile {
            root: PathBuf::from("specs/calc.carinata"),
            path: PathBuf::from("specs/calc.carinata"),
        };
        assert_eq!(spec.output_path(Path::new("out")), PathBuf::from("out/calc.py"));
    }

    #[test]
    fn fingerprint_tracks_settings() {
        let options = GeneratorOptions::default();
        let markers = GeneratorOptions {
            line_markers: true,
            ..GeneratorOptions::default()
        };
        assert_eq!(fingerprint("x", &options), fingerprint("x", &options));
        assert_ne!(fingerprint("x", &options), fingerprint("y", &options));
        assert_ne!(fingerprint("x", &options), fingerprint("x", &markers));
    }

    #[test]
    fn compiled_source_is_stamped_and_stable() {
        let source = "describe \"A\":\n    before \"b\": pass\n    it \"x\": pass\n";
        let options = GeneratorOptions::default();
        let first = compile_source(SourceContext::anonymous(source), "/specs/a.carinata", &options).unwrap();
        let second = compile_source(SourceContext::anonymous(source), "/specs/a.carinata", &options).unwrap();
        assert_eq!(first, second);

        let hash = FileHeader::read_hash(&first).unwrap();
        assert_eq!(hash, format!("{:x}", fingerprint(source, &options)));
        assert_eq!(hash.len(), 64);
        assert!(first.contains("# /specs/a.carinata\n"));
    }
}
