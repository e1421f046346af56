use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pipeline::{SegmenterConfig, ToolCommand};

/// REST backend for interactive point cloud segmentation.
#[derive(Parser, Debug, Clone)]
#[command(name = "backend")]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "INTERSEG_BIND", default_value = "0.0.0.0:9500")]
    pub bind: SocketAddr,

    /// Directory for session files. Served under /static
    #[arg(long, env = "INTERSEG_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Idle time after which a session and its files are removed
    #[arg(long, env = "INTERSEG_SESSION_TTL_SECS", default_value_t = 3600)]
    pub session_ttl_secs: u64,

    /// How often expired sessions are looked for
    #[arg(long, env = "INTERSEG_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Largest accepted request body in megabytes
    #[arg(long, env = "INTERSEG_MAX_UPLOAD_MB", default_value_t = 512)]
    pub max_upload_mb: usize,

    /// Origin allowed to call the API with credentials. Repeatable
    #[arg(
        long = "allowed-origin",
        env = "INTERSEG_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = ["https://localhost:3001", "https://127.0.0.1:3001"]
    )]
    pub allowed_origins: Vec<String>,

    /// Command line of the click segmentation network
    #[arg(long, env = "INTERSEG_CLICK_SEGMENTER")]
    pub click_segmenter: Option<ToolCommand>,

    /// Command line of the instance segmenter that annotates rendered views
    #[arg(long, env = "INTERSEG_INSTANCE_SEGMENTER")]
    pub instance_segmenter: Option<ToolCommand>,

    /// Command line of the multi-view object recognizer
    #[arg(long, env = "INTERSEG_OBJECT_RECOGNIZER")]
    pub object_recognizer: Option<ToolCommand>,

    /// Blender executable
    #[arg(long, env = "INTERSEG_BLENDER")]
    pub blender: Option<ToolCommand>,

    /// Python script Blender runs to place the camera and render
    #[arg(long, env = "INTERSEG_BLENDER_SCRIPT", default_value = "control_blender.py")]
    pub blender_script: PathBuf,

    /// Checkpoint of the click segmentation network
    #[arg(long, env = "INTERSEG_SEGMENTER_WEIGHTS", default_value = "./agile3d/weights/checkpoint1099.pth")]
    pub segmenter_weights: PathBuf,

    /// Voxel size the segmentation network quantizes the cloud to
    #[arg(long, env = "INTERSEG_VOXEL_SIZE", default_value_t = 0.05)]
    pub voxel_size: f32,

    /// Time limit for a single external tool run
    #[arg(long, env = "INTERSEG_TOOL_TIMEOUT_SECS", default_value_t = 600)]
    pub tool_timeout_secs: u64,
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn segmenter(&self) -> SegmenterConfig {
        SegmenterConfig {
            weights: self.segmenter_weights.clone(),
            voxel_size: self.voxel_size,
        }
    }
}
