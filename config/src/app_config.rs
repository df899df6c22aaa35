use directories::ProjectDirs;
use std::{
    env,
    path::PathBuf,
};

lazy_static::lazy_static! {
    pub(crate) static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME")
        .trim_end_matches("_config")
        .to_uppercase();
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{}_CONFIG_DIR", PROJECT_NAME.clone()))
        .ok()
        .map(PathBuf::from);
}

/// Directory holding the optional `config.yaml`.
///
/// `LAMBDASTAT_CONFIG_DIR` wins over the platform default.
pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

/// Prefix of the environment variables that override configuration keys.
pub fn env_prefix() -> &'static str {
    PROJECT_NAME.as_str()
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "lambdastat", "lambdastat")
}
