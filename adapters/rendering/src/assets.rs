//! Sprite manifest parsing and the process-wide asset cache.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Every asset the renderer knows how to draw, in manifest order.
pub const ALL_ASSET_KEYS: [AssetKey; 14] = [
    AssetKey::Background,
    AssetKey::Box,
    AssetKey::Landmine,
    AssetKey::Player,
    AssetKey::Rock,
    AssetKey::ZombieDead,
    AssetKey::ZombieIdleFrame1,
    AssetKey::ZombieIdleFrame2,
    AssetKey::ZombieIdleFrame3,
    AssetKey::ZombieIdleFrame4,
    AssetKey::ZombieWalkingFrame1,
    AssetKey::ZombieWalkingFrame2,
    AssetKey::ZombieWalkingFrame3,
    AssetKey::ZombieWalkingFrame4,
];

/// Frames cycled while a zombie stands still.
pub const ZOMBIE_IDLE_FRAMES: [AssetKey; 4] = [
    AssetKey::ZombieIdleFrame1,
    AssetKey::ZombieIdleFrame2,
    AssetKey::ZombieIdleFrame3,
    AssetKey::ZombieIdleFrame4,
];

/// Frames cycled while a zombie walks.
pub const ZOMBIE_WALKING_FRAMES: [AssetKey; 4] = [
    AssetKey::ZombieWalkingFrame1,
    AssetKey::ZombieWalkingFrame2,
    AssetKey::ZombieWalkingFrame3,
    AssetKey::ZombieWalkingFrame4,
];

const BUILTIN_MANIFEST: &[(AssetKey, &str)] = &[
    (AssetKey::Background, "map.webp"),
    (AssetKey::Box, "entities/box.svg"),
    (AssetKey::Landmine, "entities/landmine.svg"),
    (AssetKey::Player, "entities/player-attacking.svg"),
    (AssetKey::Rock, "entities/rock.svg"),
    (AssetKey::ZombieDead, "entities/zombie-dead.png"),
    (AssetKey::ZombieIdleFrame1, "entities/zombie-idle-frame1.png"),
    (AssetKey::ZombieIdleFrame2, "entities/zombie-idle-frame2.png"),
    (AssetKey::ZombieIdleFrame3, "entities/zombie-idle-frame3.png"),
    (AssetKey::ZombieIdleFrame4, "entities/zombie-idle-frame4.png"),
    (AssetKey::ZombieWalkingFrame1, "entities/zombie-walking-frame1.png"),
    (AssetKey::ZombieWalkingFrame2, "entities/zombie-walking-frame2.png"),
    (AssetKey::ZombieWalkingFrame3, "entities/zombie-walking-frame3.png"),
    (AssetKey::ZombieWalkingFrame4, "entities/zombie-walking-frame4.png"),
];

/// Identifies a drawable image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKey {
    /// Full-surface backdrop.
    Background,
    /// Breakable crate.
    Box,
    /// Buried explosive.
    Landmine,
    /// The survivor.
    Player,
    /// Indestructible boulder.
    Rock,
    /// Corpse left behind by a killed zombie.
    ZombieDead,
    /// First idle animation frame.
    ZombieIdleFrame1,
    /// Second idle animation frame.
    ZombieIdleFrame2,
    /// Third idle animation frame.
    ZombieIdleFrame3,
    /// Fourth idle animation frame.
    ZombieIdleFrame4,
    /// First walking animation frame.
    ZombieWalkingFrame1,
    /// Second walking animation frame.
    ZombieWalkingFrame2,
    /// Third walking animation frame.
    ZombieWalkingFrame3,
    /// Fourth walking animation frame.
    ZombieWalkingFrame4,
}

impl AssetKey {
    /// Name used for the key in manifests.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Background => "Background",
            Self::Box => "Box",
            Self::Landmine => "Landmine",
            Self::Player => "Player",
            Self::Rock => "Rock",
            Self::ZombieDead => "ZombieDead",
            Self::ZombieIdleFrame1 => "ZombieIdleFrame1",
            Self::ZombieIdleFrame2 => "ZombieIdleFrame2",
            Self::ZombieIdleFrame3 => "ZombieIdleFrame3",
            Self::ZombieIdleFrame4 => "ZombieIdleFrame4",
            Self::ZombieWalkingFrame1 => "ZombieWalkingFrame1",
            Self::ZombieWalkingFrame2 => "ZombieWalkingFrame2",
            Self::ZombieWalkingFrame3 => "ZombieWalkingFrame3",
            Self::ZombieWalkingFrame4 => "ZombieWalkingFrame4",
        }
    }

    /// Resolves a manifest name back to its key.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_ASSET_KEYS.into_iter().find(|key| key.name() == name)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved list of asset paths, one per [`AssetKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetManifest {
    entries: Vec<(AssetKey, PathBuf)>,
}

impl AssetManifest {
    /// Manifest pointing at the stock asset layout below `base`.
    #[must_use]
    pub fn builtin(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            entries: BUILTIN_MANIFEST
                .iter()
                .map(|(key, relative)| (*key, base.join(relative)))
                .collect(),
        }
    }

    /// Reads a manifest from disk, resolving paths relative to its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read asset manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml(&contents, &base)
    }

    /// Parses manifest `contents`, resolving paths relative to `base`.
    pub fn from_toml(contents: &str, base: &Path) -> Result<Self> {
        let manifest: ManifestFile =
            toml::from_str(contents).context("failed to parse asset manifest toml contents")?;
        if manifest.version != SUPPORTED_MANIFEST_VERSION {
            bail!(
                "unsupported asset manifest version {}; expected {}",
                manifest.version,
                SUPPORTED_MANIFEST_VERSION
            );
        }

        let mut resolved = HashMap::new();
        for (name, relative_path) in manifest.assets {
            let key = AssetKey::from_name(&name)
                .with_context(|| format!("unknown asset key `{name}` in manifest"))?;
            if resolved.insert(key, base.join(relative_path)).is_some() {
                bail!("asset manifest contains duplicate entry for {key}");
            }
        }

        let mut entries = Vec::with_capacity(ALL_ASSET_KEYS.len());
        for key in ALL_ASSET_KEYS {
            let Some(path) = resolved.remove(&key) else {
                bail!("asset manifest missing entry for {key}");
            };
            entries.push((key, path));
        }

        Ok(Self { entries })
    }

    /// Iterates over every key and its resolved path.
    pub fn entries(&self) -> impl Iterator<Item = (AssetKey, &Path)> {
        self.entries.iter().map(|(key, path)| (*key, path.as_path()))
    }

    /// Resolved path of `key`.
    #[must_use]
    pub fn path(&self, key: AssetKey) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, path)| path.as_path())
    }
}

#[derive(Debug, serde::Deserialize)]
struct ManifestFile {
    version: u32,
    assets: HashMap<String, String>,
}

/// Produces the raw bytes of an asset.
pub trait AssetSource {
    /// Loads the bytes stored at `path` for `key`.
    fn load(&self, key: AssetKey, path: &Path) -> Result<Vec<u8>>;
}

impl<F> AssetSource for F
where
    F: Fn(AssetKey, &Path) -> Result<Vec<u8>>,
{
    fn load(&self, key: AssetKey, path: &Path) -> Result<Vec<u8>> {
        self(key, path)
    }
}

/// Reads assets straight from the filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl AssetSource for FileSource {
    fn load(&self, _key: AssetKey, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("failed to read asset at {}", path.display()))
    }
}

/// Encoded image bytes for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    key: AssetKey,
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl Asset {
    /// Key the asset was loaded for.
    #[must_use]
    pub const fn key(&self) -> AssetKey {
        self.key
    }

    /// Location the bytes were read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoded image data.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Asset that could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetFailure {
    /// Key that failed.
    pub key: AssetKey,
    /// Path that was attempted.
    pub path: PathBuf,
    /// Rendered error chain.
    pub message: String,
}

/// Result of a completed load pass.
///
/// Individual failures do not abort the pass; affected keys are drawn as
/// placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetBundle {
    assets: HashMap<AssetKey, Asset>,
    failures: Vec<AssetFailure>,
}

impl AssetBundle {
    /// Loads every manifest entry through `source`.
    pub fn load<S>(manifest: &AssetManifest, source: &S) -> Self
    where
        S: AssetSource + ?Sized,
    {
        let mut bundle = Self::default();
        for (key, path) in manifest.entries() {
            match source.load(key, path) {
                Ok(bytes) => {
                    let _ = bundle.assets.insert(
                        key,
                        Asset {
                            key,
                            path: path.to_path_buf(),
                            bytes: bytes.into(),
                        },
                    );
                }
                Err(error) => {
                    warn!(asset = %key, path = %path.display(), "asset failed to load: {error:#}");
                    bundle.failures.push(AssetFailure {
                        key,
                        path: path.to_path_buf(),
                        message: format!("{error:#}"),
                    });
                }
            }
        }
        debug!(
            loaded = bundle.assets.len(),
            failed = bundle.failures.len(),
            "asset bundle ready"
        );
        bundle
    }

    /// Loaded asset for `key`, if any.
    #[must_use]
    pub fn get(&self, key: AssetKey) -> Option<&Asset> {
        self.assets.get(&key)
    }

    /// Number of successfully loaded assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Reports whether nothing loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets that failed to load.
    #[must_use]
    pub fn failures(&self) -> &[AssetFailure] {
        &self.failures
    }
}

#[derive(Debug)]
enum LoadState {
    NotLoaded,
    Loading,
    Loaded(Arc<AssetBundle>),
}

/// Outcome of [`AssetCache::load_with`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// This call performed the load.
    Loaded(Arc<AssetBundle>),
    /// An earlier call already finished loading.
    AlreadyLoaded(Arc<AssetBundle>),
    /// Another caller is loading right now.
    InProgress,
}

impl LoadOutcome {
    /// Bundle carried by the outcome, if loading has completed.
    #[must_use]
    pub fn bundle(&self) -> Option<&Arc<AssetBundle>> {
        match self {
            Self::Loaded(bundle) | Self::AlreadyLoaded(bundle) => Some(bundle),
            Self::InProgress => None,
        }
    }
}

/// Load-once cache of assets shared by every renderer in the process.
///
/// At most one load pass runs; callers arriving while it is in flight are
/// told to retry rather than starting a second one.
#[derive(Debug)]
pub struct AssetCache {
    state: Mutex<LoadState>,
}

static GLOBAL_ASSETS: AssetCache = AssetCache::new();

impl AssetCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::NotLoaded),
        }
    }

    /// Cache shared by the whole process.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_ASSETS
    }

    /// Loads `manifest` through `source` unless a load already ran or is running.
    ///
    /// The lock is not held while `source` runs.
    pub fn load_with<S>(&self, manifest: &AssetManifest, source: &S) -> LoadOutcome
    where
        S: AssetSource + ?Sized,
    {
        {
            let mut state = self.lock();
            match &*state {
                LoadState::Loaded(bundle) => return LoadOutcome::AlreadyLoaded(Arc::clone(bundle)),
                LoadState::Loading => return LoadOutcome::InProgress,
                LoadState::NotLoaded => *state = LoadState::Loading,
            }
        }

        let pending = PendingLoad { cache: self };
        let bundle = Arc::new(AssetBundle::load(manifest, source));
        std::mem::forget(pending);
        *self.lock() = LoadState::Loaded(Arc::clone(&bundle));
        LoadOutcome::Loaded(bundle)
    }

    /// Loaded bundle, or `None` while loading has not completed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<AssetBundle>> {
        match &*self.lock() {
            LoadState::Loaded(bundle) => Some(Arc::clone(bundle)),
            LoadState::NotLoaded | LoadState::Loading => None,
        }
    }

    /// Reports whether a load pass is currently running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(&*self.lock(), LoadState::Loading)
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the cache to `NotLoaded` if a load pass unwinds.
struct PendingLoad<'a> {
    cache: &'a AssetCache,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        *self.cache.lock() = LoadState::NotLoaded;
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn full_manifest_toml() -> String {
        let mut contents = String::from("version = 1\n\n[assets]\n");
        for key in ALL_ASSET_KEYS {
            contents.push_str(&format!("{} = \"img/{}.png\"\n", key.name(), key.name()));
        }
        contents
    }

    #[test]
    fn manifest_resolves_paths_relative_to_base() {
        let manifest =
            AssetManifest::from_toml(&full_manifest_toml(), Path::new("/srv/game")).expect("valid");
        assert_eq!(manifest.entries().count(), ALL_ASSET_KEYS.len());
        assert_eq!(
            manifest.path(AssetKey::Rock),
            Some(Path::new("/srv/game/img/Rock.png"))
        );
    }

    #[test]
    fn manifest_rejects_unknown_version() {
        let contents = full_manifest_toml().replace("version = 1", "version = 2");
        let error = AssetManifest::from_toml(&contents, Path::new(".")).expect_err("bad version");
        assert!(error.to_string().contains("unsupported asset manifest version"));
    }

    #[test]
    fn manifest_rejects_missing_and_unknown_keys() {
        let missing = full_manifest_toml().replace("Rock = \"img/Rock.png\"\n", "");
        let error = AssetManifest::from_toml(&missing, Path::new(".")).expect_err("missing");
        assert!(error.to_string().contains("missing entry for Rock"));

        let unknown = format!("{}Tower = \"tower.png\"\n", full_manifest_toml());
        let error = AssetManifest::from_toml(&unknown, Path::new(".")).expect_err("unknown");
        assert!(error.to_string().contains("unknown asset key `Tower`"));
    }

    #[test]
    fn builtin_manifest_covers_every_key() {
        let manifest = AssetManifest::builtin("public");
        for key in ALL_ASSET_KEYS {
            assert!(manifest.path(key).is_some(), "{key} missing");
        }
        assert_eq!(
            manifest.path(AssetKey::Background),
            Some(Path::new("public/map.webp"))
        );
    }

    #[test]
    fn key_names_round_trip() {
        for key in ALL_ASSET_KEYS {
            assert_eq!(AssetKey::from_name(key.name()), Some(key));
        }
        assert_eq!(AssetKey::from_name("Tower"), None);
    }

    #[test]
    fn bundle_records_failures_without_aborting() {
        let manifest = AssetManifest::builtin("public");
        let requested = RefCell::new(Vec::new());
        let source = |key: AssetKey, _path: &Path| -> Result<Vec<u8>> {
            requested.borrow_mut().push(key);
            if key == AssetKey::Rock {
                bail!("rock is missing");
            }
            Ok(vec![1, 2, 3])
        };

        let bundle = AssetBundle::load(&manifest, &source);

        assert_eq!(requested.borrow().len(), ALL_ASSET_KEYS.len());
        assert_eq!(bundle.len(), ALL_ASSET_KEYS.len() - 1);
        assert!(bundle.get(AssetKey::Rock).is_none());
        assert_eq!(bundle.failures().len(), 1);
        assert_eq!(bundle.failures()[0].key, AssetKey::Rock);
        assert_eq!(
            bundle.get(AssetKey::Player).map(Asset::bytes),
            Some(&[1_u8, 2, 3][..])
        );
    }

    #[test]
    fn cache_loads_once() {
        let cache = AssetCache::new();
        let manifest = AssetManifest::builtin("public");
        let calls = RefCell::new(0_usize);
        let source = |_key: AssetKey, _path: &Path| -> Result<Vec<u8>> {
            *calls.borrow_mut() += 1;
            Ok(Vec::new())
        };

        assert!(cache.get().is_none());
        assert!(matches!(
            cache.load_with(&manifest, &source),
            LoadOutcome::Loaded(_)
        ));
        assert!(matches!(
            cache.load_with(&manifest, &source),
            LoadOutcome::AlreadyLoaded(_)
        ));
        assert_eq!(*calls.borrow(), ALL_ASSET_KEYS.len());
        assert!(cache.get().is_some());
        assert!(!cache.is_loading());
    }

    #[test]
    fn concurrent_request_during_load_is_told_to_wait() {
        let cache = AssetCache::new();
        let manifest = AssetManifest::builtin("public");
        let nested = RefCell::new(Vec::new());
        let source = |_key: AssetKey, _path: &Path| -> Result<Vec<u8>> {
            let inner = |_key: AssetKey, _path: &Path| -> Result<Vec<u8>> {
                bail!("second load must not start")
            };
            nested.borrow_mut().push((
                cache.is_loading(),
                cache.get().is_none(),
                cache.load_with(&manifest, &inner),
            ));
            Ok(Vec::new())
        };

        let outcome = cache.load_with(&manifest, &source);

        assert!(outcome.bundle().is_some());
        assert_eq!(nested.borrow().len(), ALL_ASSET_KEYS.len());
        for (loading, absent, inner_outcome) in nested.borrow().iter() {
            assert!(*loading);
            assert!(*absent);
            assert_eq!(*inner_outcome, LoadOutcome::InProgress);
        }
        assert!(outcome
            .bundle()
            .is_some_and(|bundle| bundle.failures().is_empty()));
    }

    #[test]
    fn panicking_source_leaves_the_cache_retryable() {
        let cache = AssetCache::new();
        let manifest = AssetManifest::builtin("public");
        let exploding = |_key: AssetKey, _path: &Path| -> Result<Vec<u8>> {
            panic!("source failed mid-load")
        };

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.load_with(&manifest, &exploding)
        }));

        assert!(unwound.is_err());
        assert!(!cache.is_loading());
        assert!(cache.get().is_none());
        let healthy = |_key: AssetKey, _path: &Path| -> Result<Vec<u8>> { Ok(Vec::new()) };
        assert!(matches!(
            cache.load_with(&manifest, &healthy),
            LoadOutcome::Loaded(_)
        ));
    }
}
