use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline::{
    BlenderRenderer, ClickSegmenter, InstanceSegmenter, ObjectRecognizer, ProcessClickSegmenter,
    ProcessInstanceSegmenter, ProcessObjectRecognizer, SegmenterConfig, StillRenderer,
};
use render::ViewConfig;
use scene::{Mask, NearestIndex, PointCloud, ply};
use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{BackendError, Result};
use crate::tools::Unconfigured;

/// Output of the last successful inference of a session.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub mask: Arc<Mask>,
    pub result_path: PathBuf,
}

/// Everything one client works on between upload and expiry.
///
/// The session directory is removed when the last handle is dropped.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    dir: TempDir,
    pub filename: String,
    pub cloud_path: PathBuf,
    pub cloud: Arc<PointCloud>,
    pub index: Arc<NearestIndex>,
    results: RwLock<Option<SegmentationResult>>,
    work: Mutex<()>,
}

impl Session {
    /// Stores an uploaded file in a fresh directory under `data_dir` and loads it.
    pub fn create(data_dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self> {
        let filename = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BackendError::BadRequest("Missing file name".into()))?;
        let is_ply_name = Path::new(&filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
        if !is_ply_name || !ply::is_ply(bytes) {
            return Err(BackendError::UnsupportedFormat(filename));
        }

        let cloud = ply::read(bytes)?;
        if cloud.is_empty() {
            return Err(BackendError::BadRequest(format!("{filename} contains no points")));
        }

        fs::create_dir_all(data_dir)?;
        let dir = tempfile::Builder::new().prefix("session-").tempdir_in(data_dir)?;
        let cloud_path = dir.path().join(&filename);
        fs::write(&cloud_path, bytes)?;

        let index = NearestIndex::new(cloud.positions());
        let id = Uuid::new_v4();
        info!(
            "Session {id}: loaded {filename} with {} points (mesh: {})",
            cloud.len(),
            cloud.is_mesh()
        );

        Ok(Self {
            id,
            dir,
            filename,
            cloud_path,
            cloud: Arc::new(cloud),
            index: Arc::new(index),
            results: RwLock::new(None),
            work: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn stem(&self) -> String {
        self.cloud_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cloud".into())
    }

    pub async fn results(&self) -> Option<SegmentationResult> {
        self.results.read().await.clone()
    }

    /// Held while a tool writes into the session directory.
    pub async fn lock_work(&self) -> MutexGuard<'_, ()> {
        self.work.lock().await
    }

    pub async fn set_results(&self, results: SegmentationResult) {
        *self.results.write().await = Some(results);
    }
}

struct Entry {
    session: Arc<Session>,
    last_access: Instant,
}

/// Sessions by id. Every access refreshes the idle timer.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionStore {
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let entry = Entry {
            session: session.clone(),
            last_access: Instant::now(),
        };
        self.sessions.write().await.insert(session.id, entry);
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_access = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(&id).map(|e| e.session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than `ttl` and returns how many went.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_access.elapsed() <= ttl);
        before - sessions.len()
    }

    pub fn spawn_sweeper(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired(ttl).await;
                if removed > 0 {
                    info!("Expired {removed} idle sessions");
                }
            }
        })
    }
}

/// External collaborators, each behind its adapter trait.
pub struct Tools {
    pub segmenter_config: SegmenterConfig,
    pub segmenter: Arc<dyn ClickSegmenter>,
    pub annotator: Arc<dyn InstanceSegmenter>,
    pub recognizer: Arc<dyn ObjectRecognizer>,
    pub still_renderer: Arc<dyn StillRenderer>,
}

impl Tools {
    pub fn from_config(config: &ServerConfig) -> Self {
        let timeout = config.tool_timeout();
        let segmenter: Arc<dyn ClickSegmenter> = match &config.click_segmenter {
            Some(cmd) => Arc::new(ProcessClickSegmenter::new(cmd.clone(), timeout)),
            None => Arc::new(Unconfigured("click segmenter")),
        };
        let annotator: Arc<dyn InstanceSegmenter> = match &config.instance_segmenter {
            Some(cmd) => Arc::new(ProcessInstanceSegmenter::new(cmd.clone(), timeout)),
            None => Arc::new(Unconfigured("instance segmenter")),
        };
        let recognizer: Arc<dyn ObjectRecognizer> = match &config.object_recognizer {
            Some(cmd) => Arc::new(ProcessObjectRecognizer::new(cmd.clone(), timeout)),
            None => Arc::new(Unconfigured("object recognizer")),
        };
        let still_renderer: Arc<dyn StillRenderer> = match &config.blender {
            Some(cmd) => Arc::new(BlenderRenderer::new(
                cmd.clone(),
                config.blender_script.clone(),
                timeout,
            )),
            None => Arc::new(Unconfigured("blender")),
        };
        Self {
            segmenter_config: config.segmenter(),
            segmenter,
            annotator,
            recognizer,
            still_renderer,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub tools: Arc<Tools>,
    pub views: Arc<ViewConfig>,
    data_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(data_dir: &Path, tools: Tools) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let data_dir = fs::canonicalize(data_dir)?;
        info!("Serving session data from {}", data_dir.display());
        Ok(Self {
            sessions: SessionStore::default(),
            tools: Arc::new(tools),
            views: Arc::new(ViewConfig::default()),
            data_dir: Arc::new(data_dir),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn session(&self, id: Uuid) -> Result<Arc<Session>> {
        self.sessions
            .get(id)
            .await
            .ok_or(BackendError::SessionNotFound(id))
    }

    /// URL under `/static` for a file inside the data directory. Other paths
    /// are returned unchanged.
    pub fn static_url(&self, path: &Path) -> String {
        match path.strip_prefix(self.data_dir.as_path()) {
            Ok(relative) => {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("/static/{}", parts.join("/"))
            }
            Err(_) => path.display().to_string(),
        }
    }
}
