//! Model asset staging.
//!
//! A load attempt starts from a user-designated source folder holding seven
//! model files plus one reference clip, all under fixed names. The files
//! are stream-copied into the process-owned cache directory before anything
//! touches the engine, so later reads never depend on the source location's
//! permission or mount lifetime. Resolution is all-or-nothing: the first
//! missing entry aborts the whole attempt and no bundle is returned.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Share of overall load progress owned by the copy phase.
///
/// This is a published contract with the orchestrator: progress reported
/// from [`resolve`] ends exactly here, and the caller's init/prime
/// milestones occupy the remaining 0.2.
pub const COPY_PROGRESS_SHARE: f32 = 0.8;

/// Logical role of one required file in the model bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    G2pW,
    Vits,
    Ssl,
    T2sEncoder,
    T2sFsDecoder,
    T2sSDecoder,
    Bert,
    ReferenceAudio,
}

impl AssetRole {
    /// All required roles, in manifest order. Resolution, failure reporting
    /// and the engine's init argument order all follow this sequence.
    pub const MANIFEST: [AssetRole; 8] = [
        AssetRole::G2pW,
        AssetRole::Vits,
        AssetRole::Ssl,
        AssetRole::T2sEncoder,
        AssetRole::T2sFsDecoder,
        AssetRole::T2sSDecoder,
        AssetRole::Bert,
        AssetRole::ReferenceAudio,
    ];

    /// Expected filename under the source folder.
    pub fn file_name(self) -> &'static str {
        match self {
            AssetRole::G2pW => "g2pW.onnx",
            AssetRole::Vits => "custom_vits.onnx",
            AssetRole::Ssl => "ssl.onnx",
            AssetRole::T2sEncoder => "custom_t2s_encoder.onnx",
            AssetRole::T2sFsDecoder => "custom_t2s_fs_decoder.onnx",
            AssetRole::T2sSDecoder => "custom_t2s_s_decoder.onnx",
            AssetRole::Bert => "bert.onnx",
            AssetRole::ReferenceAudio => "ref.wav",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            AssetRole::G2pW => "g2pW",
            AssetRole::Vits => "vits",
            AssetRole::Ssl => "ssl",
            AssetRole::T2sEncoder => "t2s_encoder",
            AssetRole::T2sFsDecoder => "t2s_fs_decoder",
            AssetRole::T2sSDecoder => "t2s_s_decoder",
            AssetRole::Bert => "bert",
            AssetRole::ReferenceAudio => "ref",
        };
        f.write_str(key)
    }
}

/// Complete set of staged, readable asset paths.
///
/// Only [`resolve`] constructs one, so holding an `AssetBundle` means every
/// role was present, non-empty, and copied into the cache.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    staged: [PathBuf; 8],
}

impl AssetBundle {
    /// Bundle whose paths point under `dir` without any staging. The
    /// scripted backends never open the files, so none need to exist.
    #[cfg(test)]
    pub(crate) fn fixture(dir: &Path) -> Self {
        Self {
            staged: std::array::from_fn(|i| dir.join(AssetRole::MANIFEST[i].file_name())),
        }
    }

    /// Staged path for `role`.
    pub fn path(&self, role: AssetRole) -> &Path {
        &self.staged[role as usize]
    }

    /// The staged reference clip.
    pub fn reference_audio(&self) -> &Path {
        self.path(AssetRole::ReferenceAudio)
    }

    /// The seven model paths in the engine's init argument order.
    pub fn model_paths(&self) -> [&Path; 7] {
        [
            self.path(AssetRole::G2pW),
            self.path(AssetRole::Vits),
            self.path(AssetRole::Ssl),
            self.path(AssetRole::T2sEncoder),
            self.path(AssetRole::T2sFsDecoder),
            self.path(AssetRole::T2sSDecoder),
            self.path(AssetRole::Bert),
        ]
    }
}

/// Stage every manifest file from `source` into `cache_dir`.
///
/// `on_progress` receives the cumulative fraction after each successful
/// copy, monotonically increasing up to [`COPY_PROGRESS_SHARE`]. Failures
/// are fail-fast with no retries: the first missing or uncopyable entry
/// aborts the attempt.
pub fn resolve(
    source: &Path,
    cache_dir: &Path,
    mut on_progress: impl FnMut(f32),
) -> Result<AssetBundle, PipelineError> {
    if !source.is_dir() {
        return Err(PipelineError::InvalidSource(source.to_path_buf()));
    }
    std::fs::create_dir_all(cache_dir)?;

    let total = AssetRole::MANIFEST.len();
    let mut staged: [PathBuf; 8] = std::array::from_fn(|_| PathBuf::new());

    for (index, &role) in AssetRole::MANIFEST.iter().enumerate() {
        let src = source.join(role.file_name());
        // A zero-byte file cannot be a usable model or clip; treat it the
        // same as absent.
        match std::fs::metadata(&src) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => {
                log::error!("model file '{}' ({role}) not found in source folder", role.file_name());
                return Err(PipelineError::MissingAsset { role });
            }
        }

        let dest = cache_dir.join(role.file_name());
        stage_copy(&src, &dest).map_err(|source| PipelineError::CopyFailed { role, source })?;
        if !dest.exists() {
            return Err(PipelineError::CopyFailed {
                role,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "staged copy missing after write",
                ),
            });
        }

        log::debug!("staged {role} -> {}", dest.display());
        staged[role as usize] = dest;
        on_progress((index + 1) as f32 / total as f32 * COPY_PROGRESS_SHARE);
    }

    Ok(AssetBundle { staged })
}

fn stage_copy(src: &Path, dest: &Path) -> std::io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = File::create(dest)?;
    std::io::copy(&mut reader, &mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve, AssetRole, COPY_PROGRESS_SHARE};
    use crate::error::PipelineError;
    use std::fs;

    fn populated_source(dir: &std::path::Path) {
        for role in AssetRole::MANIFEST {
            fs::write(dir.join(role.file_name()), format!("bytes of {role}")).unwrap();
        }
    }

    #[test]
    fn resolves_complete_source_with_monotonic_progress() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        populated_source(source.path());

        let mut progress = Vec::new();
        let bundle = resolve(source.path(), cache.path(), |p| progress.push(p)).unwrap();

        assert_eq!(progress.len(), 8);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), COPY_PROGRESS_SHARE);

        for role in AssetRole::MANIFEST {
            let staged = bundle.path(role);
            assert!(staged.starts_with(cache.path()));
            assert_eq!(
                fs::read_to_string(staged).unwrap(),
                format!("bytes of {role}")
            );
        }
        assert!(bundle.reference_audio().ends_with("ref.wav"));
    }

    #[test]
    fn missing_file_fails_fast_with_its_role() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        populated_source(source.path());
        fs::remove_file(source.path().join("ssl.onnx")).unwrap();

        let mut progress = Vec::new();
        let err = resolve(source.path(), cache.path(), |p| progress.push(p)).unwrap_err();
        match err {
            PipelineError::MissingAsset { role } => assert_eq!(role, AssetRole::Ssl),
            other => panic!("expected MissingAsset, got {other:?}"),
        }
        // Roles before ssl in the manifest had already been copied when the
        // attempt aborted; none after it were touched.
        assert!(progress.len() < 8);
        assert!(!cache.path().join("bert.onnx").exists());
    }

    #[test]
    fn empty_file_counts_as_missing() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        populated_source(source.path());
        fs::write(source.path().join("bert.onnx"), b"").unwrap();

        let err = resolve(source.path(), cache.path(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingAsset {
                role: AssetRole::Bert
            }
        ));
    }

    #[test]
    fn nonexistent_source_is_invalid() {
        let cache = tempfile::tempdir().unwrap();
        let err = resolve(
            std::path::Path::new("/nonexistent/model/folder"),
            cache.path(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSource(_)));
    }

    #[test]
    fn model_paths_follow_init_argument_order() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        populated_source(source.path());

        let bundle = resolve(source.path(), cache.path(), |_| {}).unwrap();
        let names: Vec<_> = bundle
            .model_paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "g2pW.onnx",
                "custom_vits.onnx",
                "ssl.onnx",
                "custom_t2s_encoder.onnx",
                "custom_t2s_fs_decoder.onnx",
                "custom_t2s_s_decoder.onnx",
                "bert.onnx",
            ]
        );
    }
}
