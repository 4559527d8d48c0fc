use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Platform-conditional behavior the engine needs around a mutation:
/// redirection-aware path resolution and protective-attribute clearing.
/// Selected once at startup via [`current_platform_ops`]; platforms without
/// the feature get the no-op [`PortableOps`].
pub trait PlatformOps {
    /// Returns the real, accessible path for the target, undoing filesystem
    /// redirection where the platform performs any. Never fails; any
    /// detection problem falls back to the normalized input.
    fn resolve_real_path(&self, path: &Path) -> PathBuf;

    /// Best-effort removal of protective attributes prior to mutation. All
    /// failures are swallowed; the mutation itself decides success.
    fn clear_protective_attributes(&self, path: &Path);
}

/// No-op implementation for platforms without redirection or protective
/// file attributes.
pub struct PortableOps;

impl PlatformOps for PortableOps {
    fn resolve_real_path(&self, path: &Path) -> PathBuf {
        lexical_normalize(path)
    }

    fn clear_protective_attributes(&self, _path: &Path) {}
}

#[cfg(windows)]
pub struct WindowsOps;

#[cfg(windows)]
impl PlatformOps for WindowsOps {
    fn resolve_real_path(&self, path: &Path) -> PathBuf {
        let normalized = lexical_normalize(path);
        if !is_wow64_process() {
            return normalized;
        }

        // A 32-bit process sees System32 through the WOW64 redirector; the
        // Sysnative alias reaches the real directory. Substitute only when
        // the alias actually resolves on disk.
        match map_system32_to_sysnative(&normalized, &system_root()) {
            Some(mapped) if mapped.exists() => mapped,
            _ => normalized,
        }
    }

    fn clear_protective_attributes(&self, path: &Path) {
        use std::os::windows::fs::MetadataExt;

        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x0002;
        const FILE_ATTRIBUTE_SYSTEM: u32 = 0x0004;

        let Ok(metadata) = std::fs::metadata(path) else {
            return;
        };

        let attrs = metadata.file_attributes();
        if attrs & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0 {
            // Hidden/system do not block the staged rename on NTFS; the
            // read-only bit below is the one that does.
            tracing::debug!(path = %path.display(), attrs, "target carries hidden/system attributes");
        }

        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            if let Err(err) = std::fs::set_permissions(path, permissions) {
                tracing::debug!(error = %err, path = %path.display(), "failed clearing read-only attribute");
            }
        }
    }
}

#[cfg(windows)]
pub fn current_platform_ops() -> WindowsOps {
    WindowsOps
}

#[cfg(not(windows))]
pub fn current_platform_ops() -> PortableOps {
    PortableOps
}

/// Platform-conventional location of the hosts file.
pub fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        system_root()
            .join("System32")
            .join("drivers")
            .join("etc")
            .join("hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

fn system_root() -> PathBuf {
    env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
}

#[cfg(windows)]
fn is_wow64_process() -> bool {
    if env::var_os("PROCESSOR_ARCHITEW6432").is_some_and(|value| !value.is_empty()) {
        return true;
    }
    cfg!(target_pointer_width = "32") && env::var_os("ProgramFiles(x86)").is_some()
}

/// Maps a path under `<system_root>\System32` to the `Sysnative` alias.
/// Comparison is ASCII-case-insensitive, matching Windows path semantics.
/// Returns `None` when the path lies outside the redirected directory.
pub fn map_system32_to_sysnative(path: &Path, system_root: &Path) -> Option<PathBuf> {
    let system32 = system_root.join("System32");
    let rest = strip_prefix_ignore_case(path, &system32)?;
    Some(system_root.join("Sysnative").join(rest))
}

fn strip_prefix_ignore_case(path: &Path, prefix: &Path) -> Option<PathBuf> {
    let mut remaining = path.components();
    for wanted in prefix.components() {
        let found = remaining.next()?;
        if !found.as_os_str().eq_ignore_ascii_case(wanted.as_os_str()) {
            return None;
        }
    }
    Some(remaining.as_path().to_path_buf())
}

/// Lexical cleanup only: drops `.` segments and resolves `..` against the
/// preceding segment without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && out.components().next().is_none() {
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
