use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, Cursor, Read},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;

use crate::foundation::error::{SplashError, SplashResult};

/// Name of the entry holding the splash script.
pub const SCRIPT_ENTRY: &str = "splash.sls";

type ZipReader = zip::ZipArchive<BufReader<File>>;

/// Where the bytes of one entry live.
enum EntrySource {
    Inline(Vec<u8>),
    File(PathBuf),
    Zip(usize),
}

/// Read-only set of named entries: the splash script plus the images it draws.
///
/// A bundle is either a zip archive or a plain directory. Opening only builds the name index;
/// entry bytes are read, and decompressed, each time they are asked for.
#[derive(Default)]
pub struct Bundle {
    source: Option<PathBuf>,
    entries: BTreeMap<String, EntrySource>,
    archive: Option<Mutex<ZipReader>>,
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("source", &self.source)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Bundle {
    #[tracing::instrument]
    pub fn open(path: &Path) -> SplashResult<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("open bundle '{}'", path.display()))?;

        let (entries, archive) = if meta.is_dir() {
            (index_dir(path)?, None)
        } else {
            let (entries, archive) = index_zip(path)?;
            (entries, Some(Mutex::new(archive)))
        };
        tracing::debug!(entries = entries.len(), "bundle opened");

        Ok(Self {
            source: Some(path.to_path_buf()),
            entries,
            archive,
        })
    }

    /// Build an in-memory bundle. Names are normalized; invalid names are rejected.
    pub fn from_entries<N, B>(entries: impl IntoIterator<Item = (N, B)>) -> SplashResult<Self>
    where
        N: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let mut out = BTreeMap::new();
        for (name, bytes) in entries {
            let key = normalize_entry_name(name.as_ref())?;
            if out
                .insert(key.clone(), EntrySource::Inline(bytes.into()))
                .is_some()
            {
                return Err(SplashError::bundle(format!("duplicate entry '{key}'")));
            }
        }
        Ok(Self {
            source: None,
            entries: out,
            archive: None,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        normalize_entry_name(name).is_ok_and(|key| self.entries.contains_key(&key))
    }

    /// Read entry `name`. Unknown names give `EntryNotFound`; a listed entry that can no
    /// longer be read gives an I/O error.
    pub fn entry(&self, name: &str) -> SplashResult<Vec<u8>> {
        let not_found = || SplashError::EntryNotFound(name.to_string());
        let key = normalize_entry_name(name).map_err(|_| not_found())?;

        match self.entries.get(&key).ok_or_else(not_found)? {
            EntrySource::Inline(bytes) => Ok(bytes.clone()),
            EntrySource::File(path) => {
                Ok(std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?)
            }
            EntrySource::Zip(index) => {
                let archive = self
                    .archive
                    .as_ref()
                    .ok_or_else(|| SplashError::bundle(format!("'{key}' has no archive")))?;
                let mut archive = archive
                    .lock()
                    .map_err(|_| SplashError::bundle("zip archive lock poisoned"))?;
                let mut f = archive
                    .by_index(*index)
                    .with_context(|| format!("open zip entry '{key}'"))?;
                let mut buf = Vec::with_capacity(usize::try_from(f.size()).unwrap_or(0));
                f.read_to_end(&mut buf)
                    .with_context(|| format!("decompress zip entry '{key}'"))?;
                tracing::trace!(entry = %key, bytes = buf.len(), "zip entry read");
                Ok(buf)
            }
        }
    }

    pub fn reader(&self, name: &str) -> SplashResult<impl Read> {
        Ok(Cursor::new(self.entry(name)?))
    }

    /// The splash script, decoded as UTF-8.
    pub fn script(&self) -> SplashResult<String> {
        let mut text = String::new();
        self.reader(SCRIPT_ENTRY)?
            .read_to_string(&mut text)
            .with_context(|| format!("read '{SCRIPT_ENTRY}' as UTF-8"))?;
        Ok(text)
    }
}

/// Canonical entry key: forward slashes, no empty or `.` segments, never absolute or `..`.
pub fn normalize_entry_name(name: &str) -> SplashResult<String> {
    let s = name.replace('\\', "/");
    if s.starts_with('/') {
        return Err(SplashError::bundle(format!(
            "entry name '{name}' must be relative"
        )));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(SplashError::bundle(format!(
                "entry name '{name}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(SplashError::bundle("entry name must contain a file name"));
    }
    Ok(out.join("/"))
}

fn index_zip(path: &Path) -> SplashResult<(BTreeMap<String, EntrySource>, ZipReader)> {
    let file = File::open(path).with_context(|| format!("open bundle '{}'", path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("read zip archive '{}'", path.display()))?;

    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        // Raw access reads the header only; nothing is decompressed here.
        let f = archive
            .by_index_raw(i)
            .with_context(|| format!("read zip entry #{i}"))?;
        if f.is_dir() {
            continue;
        }
        let Ok(key) = normalize_entry_name(f.name()) else {
            tracing::warn!(entry = %f.name(), "skipping zip entry with unsafe name");
            continue;
        };
        entries.insert(key, EntrySource::Zip(i));
    }
    Ok((entries, archive))
}

fn index_dir(root: &Path) -> SplashResult<BTreeMap<String, EntrySource>> {
    let mut entries = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let listing =
            std::fs::read_dir(&dir).with_context(|| format!("list '{}'", dir.display()))?;
        for item in listing {
            let item = item.with_context(|| format!("list '{}'", dir.display()))?;
            let path = item.path();
            let file_type = item
                .file_type()
                .with_context(|| format!("stat '{}'", path.display()))?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let rel = path
                .strip_prefix(root)
                .map_err(|_| SplashError::bundle(format!("'{}' escapes bundle", path.display())))?;
            let key = normalize_entry_name(&rel.to_string_lossy())?;
            entries.insert(key, EntrySource::File(path));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_entry_names() {
        assert_eq!(normalize_entry_name("logo.png").unwrap(), "logo.png");
        assert_eq!(normalize_entry_name("./img//a.png").unwrap(), "img/a.png");
        assert_eq!(normalize_entry_name("img\\a.png").unwrap(), "img/a.png");
        assert!(normalize_entry_name("/etc/passwd").is_err());
        assert!(normalize_entry_name("../x.png").is_err());
        assert!(normalize_entry_name("./").is_err());
    }

    #[test]
    fn lookup_by_name() {
        let b = Bundle::from_entries([("splash.sls", b"clear\n".to_vec()), ("img/a.png", vec![1])])
            .unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.entry("./img/a.png").unwrap(), vec![1u8]);
        assert!(b.contains("img\\a.png"));
        assert_eq!(b.script().unwrap(), "clear\n");
        assert_eq!(b.names().collect::<Vec<_>>(), ["img/a.png", "splash.sls"]);
    }

    #[test]
    fn missing_entries_are_not_found() {
        let b = Bundle::from_entries([("a.png", vec![0u8])]).unwrap();
        assert!(matches!(b.entry("b.png"), Err(SplashError::EntryNotFound(n)) if n == "b.png"));
        assert!(matches!(b.entry("../a.png"), Err(SplashError::EntryNotFound(_))));
        assert!(matches!(b.script(), Err(SplashError::EntryNotFound(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert!(Bundle::from_entries([("a.png", vec![0u8]), ("./a.png", vec![1u8])]).is_err());
    }

    #[test]
    fn script_must_be_utf8() {
        let b = Bundle::from_entries([(SCRIPT_ENTRY, vec![0xffu8, 0xfe])]).unwrap();
        assert!(matches!(b.script(), Err(SplashError::Other(_))));
    }
}
