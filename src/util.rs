use std::path::{Component, Path, PathBuf};

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// `<resource_id>` with its last extension removed (`R1.zip` -> `R1`).
pub(crate) fn archive_stem(resource_id: &str) -> &str {
    let name = resource_id.rsplit(['/', '\\']).next().unwrap_or(resource_id);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

pub(crate) fn extraction_dir(dir: &Path, resource_id: &str) -> PathBuf {
    dir.join(archive_stem(resource_id))
}

/// True when `name` is a single file name with no directory parts (`R1.zip`, not `../R1.zip`).
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub(crate) fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}
