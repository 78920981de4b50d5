//! Turns generated programs into running processes.
//!
//! The native compiler and the process launch sit behind the [`Toolchain`]
//! and [`Runner`] traits, so the pipeline can be driven without either.
//! [`Cc`] and [`NativeRunner`] are the real implementations.
//!
//! Every build overwrites the same intermediate file and executable inside
//! the configured work directory. Concurrent invocations must use distinct
//! work directories.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::{parser, token::Spanned};

/// Environment variable naming the C compiler used by [`Config::from_env`].
pub const CC_ENV: &str = "EXPRC_CC";

pub const DEFAULT_COMPILER: &str = "cc";
pub const DEFAULT_SOURCE_NAME: &str = "a.out.c";

/// Where the compiler leaves its output when given no `-o` flag.
pub const ARTIFACT_NAME: &str = if cfg!(windows) { "a.exe" } else { "a.out" };

/// Lexes, parses and generates `src`, then builds and runs it with the
/// native toolchain configured from the environment.
pub fn compile_and_run(src: &str) -> Result<Execution, Error> {
    Driver::native(Config::from_env(), false).compile_and_run(src)
}

/// An executable produced by a [`Toolchain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
}

/// Outcome of a program that terminated normally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    /// Exit status as reported by the operating system. This is the computed
    /// value of the expression truncated to the platform's status range
    /// (`0..=255` on Unix).
    pub code: i32,
    /// Captured stdout followed by stderr, if the runner captures output.
    pub output: Option<String>,
}

pub trait Toolchain {
    fn build(&self, program: &str) -> Result<Artifact, BuildError>;
}

pub trait Runner {
    fn run(&self, artifact: &Artifact) -> Result<Execution, RuntimeError>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(#[from] Spanned<parser::Error>),
    /// The toolchain rejected the generated program, which is kept for
    /// diagnosis.
    #[error("{source}")]
    Build { source: BuildError, program: String },
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("toolchain failed ({})", describe_status(.status))]
    ToolchainFailure {
        status: Option<i32>,
        /// Combined stdout and stderr of the compiler.
        output: String,
    },
    #[error("compiler `{}` not found", .compiler.display())]
    CompilerNotFound {
        compiler: PathBuf,
        source: which::Error,
    },
    #[error("toolchain succeeded but produced no artifact at {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("toolchain i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("program terminated abnormally ({})", describe_signal(.signal))]
    AbnormalTermination { signal: Option<i32> },
    #[error("failed to launch program: {0}")]
    Io(#[from] io::Error),
}

#[allow(clippy::ref_option)]
fn describe_status(status: &Option<i32>) -> String {
    match *status {
        Some(code) => format!("exit status {code}"),
        None => "killed by signal".to_string(),
    }
}

#[allow(clippy::ref_option)]
fn describe_signal(signal: &Option<i32>) -> String {
    match *signal {
        Some(signal) => format!("signal {signal}"),
        None => "unknown cause".to_string(),
    }
}

pub struct Driver<T, R> {
    toolchain: T,
    runner: R,
}

impl Driver<Cc, NativeRunner> {
    pub fn native(config: Config, capture_output: bool) -> Self {
        Driver::new(Cc::new(config), NativeRunner { capture_output })
    }
}

impl<T, R> Driver<T, R>
where
    T: Toolchain,
    R: Runner,
{
    pub fn new(toolchain: T, runner: R) -> Driver<T, R> {
        Driver { toolchain, runner }
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the front end only. No toolchain step happens.
    pub fn compile(&self, src: &str) -> Result<String, Error> {
        crate::compile(src).map_err(|error| {
            debug!(offset = error.span.lo, %error, "syntax error");
            Error::Syntax(error)
        })
    }

    pub fn compile_and_run(&self, src: &str) -> Result<Execution, Error> {
        let program = self.compile(src)?;
        self.build_and_run(program)
    }

    /// Builds and runs an already generated program. The artifact is only
    /// run if the build succeeded.
    pub fn build_and_run(&self, program: String) -> Result<Execution, Error> {
        let artifact = match self.toolchain.build(&program) {
            Ok(artifact) => artifact,
            Err(source) => {
                debug!(error = %source, "build failed");
                return Err(Error::Build { source, program });
            }
        };
        debug!(artifact = %artifact.path.display(), "build finished");

        let execution = self.runner.run(&artifact).inspect_err(|error| {
            debug!(%error, "run failed");
        })?;
        info!(code = execution.code, "program exited");
        Ok(execution)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Compiler executable, either a name looked up in `PATH` or a path.
    pub compiler: PathBuf,
    /// Directory holding the intermediate source and the artifact. The
    /// compiler runs with this as its working directory.
    pub work_dir: PathBuf,
    pub source_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            work_dir: PathBuf::from("."),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
        }
    }
}

impl Config {
    /// The default configuration, with the compiler taken from [`CC_ENV`]
    /// when it is set and non-empty.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        if let Some(compiler) = env::var_os(CC_ENV).filter(|v| !v.is_empty()) {
            config.compiler = PathBuf::from(compiler);
        }
        config
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source_name)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(ARTIFACT_NAME)
    }
}

/// A C compiler invoked as `<compiler> <source>`.
pub struct Cc {
    config: Config,
}

impl Cc {
    pub fn new(config: Config) -> Cc {
        Cc { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Toolchain for Cc {
    fn build(&self, program: &str) -> Result<Artifact, BuildError> {
        let compiler =
            which::which(&self.config.compiler).map_err(|source| BuildError::CompilerNotFound {
                compiler: self.config.compiler.clone(),
                source,
            })?;

        let source_path = self.config.source_path();
        fs::write(&source_path, program)?;
        debug!(path = %source_path.display(), bytes = program.len(), "wrote program");

        // A failed build must not leave the previous executable behind.
        let artifact_path = self.config.artifact_path();
        remove_if_exists(&artifact_path)?;

        info!(compiler = %compiler.display(), source = %source_path.display(), "invoking toolchain");
        let out = Command::new(&compiler)
            .arg(&self.config.source_name)
            .current_dir(&self.config.work_dir)
            .output()?;

        if !out.status.success() {
            let output = combined_output(&out.stdout, &out.stderr);
            return Err(BuildError::ToolchainFailure {
                status: out.status.code(),
                output,
            });
        }
        if !artifact_path.is_file() {
            return Err(BuildError::MissingArtifact(artifact_path));
        }

        Ok(Artifact {
            path: artifact_path,
        })
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(stderr));
    output
}

/// Launches artifacts as child processes, with no arguments.
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeRunner {
    /// Collect stdout and stderr instead of inheriting the parent's streams.
    pub capture_output: bool,
}

impl Runner for NativeRunner {
    fn run(&self, artifact: &Artifact) -> Result<Execution, RuntimeError> {
        info!(artifact = %artifact.path.display(), "running program");
        let mut command = Command::new(&artifact.path);

        let (status, output) = if self.capture_output {
            let out = command.output()?;
            (out.status, Some(combined_output(&out.stdout, &out.stderr)))
        } else {
            (command.status()?, None)
        };

        let code = exit_code(status)?;
        Ok(Execution { code, output })
    }
}

/// A normal exit yields its status code. Anything else (a signal, a crash)
/// is an error.
pub fn exit_code(status: ExitStatus) -> Result<i32, RuntimeError> {
    match status.code() {
        Some(code) => Ok(code),
        None => Err(RuntimeError::AbnormalTermination {
            signal: signal_of(status),
        }),
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_: ExitStatus) -> Option<i32> {
    None
}
