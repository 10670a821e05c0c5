use std::path::{Component, Path, PathBuf};

/// Device path prefixes where the mirrored layout begins, searched in order.
pub const DEFAULT_MARKERS: &[&str] = &["/DCIM/", "/GMetrix/"];

/// Maps remote media to local destinations under a fixed output root.
///
/// In flat mode the logical name becomes the filename. In mirror mode the
/// destination is taken from the URL, starting at the first known marker
/// segment, so the camera's folder layout is reproduced locally.
#[derive(Debug, Clone)]
pub struct PathMapper {
    root: PathBuf,
    markers: Vec<String>,
}

impl PathMapper {
    pub fn new(root: &Path, markers: Vec<String>) -> Self {
        Self {
            root: normalize_path(root),
            markers,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local destination for one remote file. Never fails: a URL with no
    /// recognisable structure still yields a path under the root.
    pub fn map(&self, name: &str, url: &str, mirror: bool) -> PathBuf {
        let relative = if mirror {
            self.mirrored_suffix(url)
        } else {
            name
        };
        confine(&self.root, relative)
    }

    fn mirrored_suffix<'a>(&self, url: &'a str) -> &'a str {
        let path = url_path(url);
        self.markers
            .iter()
            .find_map(|marker| path.find(marker.as_str()).map(|i| &path[i..]))
            .unwrap_or(path)
    }
}

/// Path portion of a URL: everything after the authority, without query or
/// fragment. Strings without a scheme are treated as paths already.
fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(i) => {
            let after_scheme = &url[i + 3..];
            match after_scheme.find('/') {
                Some(j) => &after_scheme[j..],
                None => "",
            }
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// Join `relative` onto `root`, resolving `.` and `..` lexically. `..`
/// never climbs above `root`.
fn confine(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                path.pop();
                depth -= 1;
            }
            Component::ParentDir
            | Component::CurDir
            | Component::RootDir
            | Component::Prefix(_) => {}
        }
    }
    path
}

/// Lexical path normalization: drops `.` segments and resolves `..`
/// against preceding normal segments. Leading `..` of a relative path is
/// kept; `..` at the root of an absolute path is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut normals = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::Normal(part) => {
                out.push(part);
                normals += 1;
            }
            Component::ParentDir => {
                if normals > 0 {
                    out.pop();
                    normals -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> PathMapper {
        PathMapper::new(
            Path::new("/data"),
            DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        )
    }

    #[test]
    fn test_flat_mode_uses_name() {
        let m = mapper();
        assert_eq!(
            m.map("VID_0001.MP4", "http://cam/DCIM/100VIRB/VID_0001.MP4", false),
            PathBuf::from("/data/VID_0001.MP4")
        );
    }

    #[test]
    fn test_flat_mode_ignores_url() {
        let m = mapper();
        let expected = m.map("VID_0001.MP4", "", false);
        for url in [
            "http://cam/DCIM/100VIRB/VID_0001.MP4",
            "http://other/GMetrix/x.fit",
            "garbage",
            "",
        ] {
            assert_eq!(m.map("VID_0001.MP4", url, false), expected);
        }
    }

    #[test]
    fn test_mirror_mode_keeps_dcim_layout() {
        let m = mapper();
        assert_eq!(
            m.map("VID_0001.MP4", "http://cam/DCIM/100VIRB/VID_0001.MP4", true),
            PathBuf::from("/data/DCIM/100VIRB/VID_0001.MP4")
        );
        assert_eq!(
            m.map("", "http://cam/DCIM/100VIRB/VID_0001.THM", true),
            PathBuf::from("/data/DCIM/100VIRB/VID_0001.THM")
        );
    }

    #[test]
    fn test_mirror_mode_second_marker() {
        let m = mapper();
        assert_eq!(
            m.map("", "http://cam/prefix/GMetrix/2019-05-01-12-00-00.fit", true),
            PathBuf::from("/data/GMetrix/2019-05-01-12-00-00.fit")
        );
    }

    #[test]
    fn test_mirror_mode_marker_order_wins_over_position() {
        let m = mapper();
        // `/GMetrix/` appears first in the string, but `/DCIM/` is earlier in
        // the marker list.
        assert_eq!(
            m.map("", "http://cam/GMetrix/DCIM/a/DCIM/b.MP4", true),
            PathBuf::from("/data/DCIM/a/DCIM/b.MP4")
        );
    }

    #[test]
    fn test_mirror_mode_without_marker_uses_url_path() {
        let m = mapper();
        assert_eq!(
            m.map("x", "http://cam/media/clip.MP4?token=1", true),
            PathBuf::from("/data/media/clip.MP4")
        );
        assert_eq!(m.map("x", "http://cam", true), PathBuf::from("/data"));
    }

    #[test]
    fn test_mirror_mode_relative_locator() {
        let m = mapper();
        assert_eq!(
            m.map("", "/DCIM/100VIRB/VID_0001.FIT", true),
            PathBuf::from("/data/DCIM/100VIRB/VID_0001.FIT")
        );
    }

    #[test]
    fn test_custom_markers() {
        let m = PathMapper::new(Path::new("/data"), vec!["/videos/".to_string()]);
        assert_eq!(
            m.map("", "http://10.5.5.9:8080/videos/DCIM/100GOPRO/GX010001.MP4", true),
            PathBuf::from("/data/videos/DCIM/100GOPRO/GX010001.MP4")
        );
    }

    #[test]
    fn test_parent_segments_cannot_escape_root() {
        let m = mapper();
        assert_eq!(
            m.map("../../etc/passwd", "", false),
            PathBuf::from("/data/etc/passwd")
        );
        assert_eq!(
            m.map("", "http://cam/DCIM/../../../x.MP4", true),
            PathBuf::from("/data/x.MP4")
        );
        assert_eq!(
            m.map("a/./b/../c.MP4", "", false),
            PathBuf::from("/data/a/c.MP4")
        );
    }

    #[test]
    fn test_output_is_normalized_and_stable() {
        let m = PathMapper::new(Path::new("/data/./incoming/../"), Vec::new());
        assert_eq!(m.root(), Path::new("/data"));
        let inputs = [
            ("VID_0001.MP4", "http://cam/DCIM/100VIRB/VID_0001.MP4"),
            ("./a/../b", "http://cam/./DCIM/./x/../y.MP4"),
            ("", ""),
            ("..", "http://cam/.."),
        ];
        for (name, url) in inputs {
            for mirror in [false, true] {
                let mapped = m.map(name, url, mirror);
                assert_eq!(normalize_path(&mapped), mapped);
                assert!(mapped.starts_with("/data"));
                assert!(!mapped
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::CurDir)));
            }
        }
    }

    #[test]
    fn test_normalize_relative_root() {
        assert_eq!(normalize_path(Path::new("./media/")), PathBuf::from("media"));
        assert_eq!(normalize_path(Path::new("../media")), PathBuf::from("../media"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("http://cam/DCIM/a.MP4"), "/DCIM/a.MP4");
        assert_eq!(url_path("http://cam:80/a?b=c#d"), "/a");
        assert_eq!(url_path("http://cam"), "");
        assert_eq!(url_path("/DCIM/a.MP4"), "/DCIM/a.MP4");
    }
}
