//! Process boundary to exiftool.
//!
//! Reading uses `exiftool -X` (RDF/XML, composite tags suppressed with
//! `-e` unless configured otherwise); writing pipes a one-record JSON
//! array to `exiftool -j=- -overwrite_original`. Both run as one-shot
//! child processes with an optional wall-clock timeout.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::SyncError;
use crate::rdf;
use crate::{CuratedMetadata, PropagateConfig, RawMetadata};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Capability boundary for the external metadata tool, narrow enough for
/// tests to substitute an in-memory fake without spawning processes.
pub trait MetadataBackend {
    /// Reads all metadata of the image at `path`.
    fn extract(&self, path: &Path) -> Result<RawMetadata, SyncError>;

    /// Applies the curated record to the image at `path`, overwriting its
    /// metadata in place. Pixel data is untouched.
    fn apply(&self, curated: &CuratedMetadata, path: &Path) -> Result<(), SyncError>;
}

/// Invokes the real `exiftool` binary.
pub struct ExifTool {
    executable: PathBuf,
    include_composite: bool,
    timeout: Option<Duration>,
}

impl ExifTool {
    pub fn new(config: &PropagateConfig) -> Self {
        Self {
            executable: PathBuf::from("exiftool"),
            include_composite: config.include_composite,
            timeout: config.tool_timeout,
        }
    }

    /// Points at a specific executable instead of `exiftool` on PATH.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Runs the tool once, optionally feeding `payload` to its stdin, and
    /// returns captured stdout/stderr. Non-zero exit and timeout both
    /// surface as [`SyncError::ExternalTool`].
    fn run_tool(
        &self,
        action: &'static str,
        args: Vec<OsString>,
        payload: Option<Vec<u8>>,
    ) -> Result<(Vec<u8>, Vec<u8>), SyncError> {
        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(if payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(payload) = payload {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                std::io::Error::other("no stdin handle on spawned exiftool")
            })?;
            // Writer runs on its own thread so a full pipe cannot deadlock
            // against our stdout read.
            thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            });
        }

        let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
            std::io::Error::other("no stdout handle on spawned exiftool")
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            std::io::Error::other("no stderr handle on spawned exiftool")
        })?;
        let stdout_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf);
            buf
        });
        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf);
            buf
        });

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        let stderr = stderr_reader.join().unwrap_or_default();
                        return Err(SyncError::ExternalTool {
                            action,
                            exit_code: None,
                            stderr: format!(
                                "no response within {limit:?}; {}",
                                String::from_utf8_lossy(&stderr).trim_end()
                            ),
                        });
                    }
                    thread::sleep(EXIT_POLL_INTERVAL);
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        if !status.success() {
            return Err(SyncError::ExternalTool {
                action,
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok((stdout, stderr))
    }
}

impl MetadataBackend for ExifTool {
    fn extract(&self, path: &Path) -> Result<RawMetadata, SyncError> {
        let mut args: Vec<OsString> = vec![OsString::from("-X")];
        if !self.include_composite {
            // -e: do not generate composite tags
            args.push(OsString::from("-e"));
        }
        args.push(path.as_os_str().to_owned());

        debug!("reading metadata: {} -X {}", self.executable.display(), path.display());
        let (stdout, _) = self.run_tool("read", args, None)?;
        let text = String::from_utf8_lossy(&stdout);
        rdf::parse_description(&text)
    }

    fn apply(&self, curated: &CuratedMetadata, path: &Path) -> Result<(), SyncError> {
        // The write tool expects an array of per-file records, always
        // exactly one here.
        let payload = serde_json::to_vec(&[curated])
            .map_err(|e| SyncError::Parse(format!("could not encode curated metadata: {e}")))?;

        info!("applying {} field(s) to {}", curated.len(), path.display());
        debug!("payload: {}", String::from_utf8_lossy(&payload));

        let args: Vec<OsString> = vec![
            OsString::from("-v1"),
            OsString::from("-j=-"),
            OsString::from("-overwrite_original"),
            path.as_os_str().to_owned(),
        ];
        let (stdout, stderr) = self.run_tool("write", args, Some(payload))?;

        // A clean exit that still printed to the error channel is treated
        // as a failed write: the file may be half-updated.
        if !stderr.is_empty() {
            return Err(SyncError::ExternalTool {
                action: "write",
                exit_code: Some(0),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        if !stdout.is_empty() {
            debug!("exiftool: {}", String::from_utf8_lossy(&stdout).trim_end());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::TagValue;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Drops a fake "exiftool" shell script into a temp dir.
    fn fake_tool(body: &str) -> anyhow::Result<(TempDir, PathBuf)> {
        let dir = TempDir::new()?;
        let path = dir.path().join("exiftool");
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok((dir, path))
    }

    fn backend(exe: PathBuf, timeout: Option<Duration>) -> ExifTool {
        let mut config = PropagateConfig::default();
        config.tool_timeout = timeout;
        ExifTool::new(&config).with_executable(exe)
    }

    #[test]
    fn extract_parses_tool_output() -> anyhow::Result<()> {
        let xml = "<rdf:RDF xmlns:rdf='r'><rdf:Description>\
                   <IFD0:Make>OLY</IFD0:Make></rdf:Description></rdf:RDF>";
        let (_dir, exe) = fake_tool(&format!("echo \"{xml}\""))?;
        let raw = backend(exe, None).extract(Path::new("whatever.RW2"))?;
        assert_eq!(raw.get("IFD0:Make"), Some(&TagValue::from("OLY")));
        Ok(())
    }

    #[test]
    fn nonzero_exit_carries_code_and_stderr() -> anyhow::Result<()> {
        let (_dir, exe) = fake_tool("echo 'File format error' >&2; exit 1")?;
        let err = backend(exe, None)
            .extract(Path::new("whatever.RW2"))
            .unwrap_err();
        match err {
            SyncError::ExternalTool { action, exit_code, stderr } => {
                assert_eq!(action, "read");
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("File format error"));
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn stalled_tool_times_out() -> anyhow::Result<()> {
        let (_dir, exe) = fake_tool("sleep 30")?;
        let err = backend(exe, Some(Duration::from_millis(200)))
            .extract(Path::new("whatever.RW2"))
            .unwrap_err();
        assert!(
            matches!(err, SyncError::ExternalTool { exit_code: None, .. }),
            "{err:?}"
        );
        Ok(())
    }

    #[test]
    fn apply_pipes_single_record_json() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let sink = dir.path().join("stdin.json");
        let exe = dir.path().join("exiftool");
        fs::write(&exe, format!("#!/bin/sh\ncat > {}\n", sink.display()))?;
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755))?;

        let mut curated = CuratedMetadata::new();
        curated.insert("FocalLength".into(), "14.0".into());
        curated.insert("Make".into(), "OLY".into());
        backend(exe, None).apply(&curated, Path::new("export.jpg"))?;

        let piped: serde_json::Value = serde_json::from_str(&fs::read_to_string(&sink)?)?;
        assert_eq!(
            piped,
            serde_json::json!([{ "FocalLength": "14.0", "Make": "OLY" }])
        );
        Ok(())
    }

    #[test]
    fn full_pipeline_against_fake_tool() -> anyhow::Result<()> {
        use crate::Pipeline;

        let photos = TempDir::new()?;
        let export = photos.path().join("export");
        fs::create_dir(&export)?;
        fs::write(photos.path().join("IMG_100.RW2"), b"raw")?;
        let derivative = export.join("IMG_100_edit.jpg");
        fs::write(&derivative, b"jpeg")?;

        let tools = TempDir::new()?;
        let sink = tools.path().join("stdin.json");
        let exe = tools.path().join("exiftool");
        // Read mode is recognizable by its -X flag; anything else is a write.
        fs::write(
            &exe,
            format!(
                "#!/bin/sh\n\
                 if [ \"$1\" = \"-X\" ]; then\n\
                 echo \"<rdf:RDF xmlns:rdf='r'><rdf:Description>\
                 <ExifIFD:FocalLength>14.0 mm</ExifIFD:FocalLength>\
                 <IFD0:Make>OLY</IFD0:Make>\
                 <LensType>Wide Zoom</LensType>\
                 </rdf:Description></rdf:RDF>\"\n\
                 else\n\
                 cat > {}\n\
                 fi\n",
                sink.display()
            ),
        )?;
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755))?;

        let config = PropagateConfig::default();
        let backend = ExifTool::new(&config).with_executable(exe);
        let done = Pipeline::new(config, backend).run(&derivative).unwrap();

        assert_eq!(done.source, photos.path().join("IMG_100.RW2"));
        let piped: serde_json::Value = serde_json::from_str(&fs::read_to_string(&sink)?)?;
        assert_eq!(
            piped,
            serde_json::json!([{
                "FocalLength": "14.0",
                "Make": "OLY",
                "LensModel": "Wide Zoom",
            }])
        );
        Ok(())
    }

    #[test]
    fn stderr_output_fails_the_write() -> anyhow::Result<()> {
        let (_dir, exe) = fake_tool("cat > /dev/null; echo 'Warning: bad tag' >&2; exit 0")?;
        let err = backend(exe, None)
            .apply(&CuratedMetadata::new(), Path::new("export.jpg"))
            .unwrap_err();
        match err {
            SyncError::ExternalTool { exit_code, stderr, .. } => {
                assert_eq!(exit_code, Some(0));
                assert!(stderr.contains("bad tag"));
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
        Ok(())
    }
}
