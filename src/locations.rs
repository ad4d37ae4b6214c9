use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "deskboard";

pub fn resolve_data_dir(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	base_dir(
		"DESKBOARD_DATA_DIR",
		"XDG_DATA_HOME",
		&[".local", "share"],
		".deskboard",
	)
}

/// Where logs go; kept apart from the documents.
pub fn state_dir() -> PathBuf {
	base_dir(
		"DESKBOARD_STATE_DIR",
		"XDG_STATE_HOME",
		&[".local", "state"],
		".deskboard_state",
	)
}

pub fn config_dir() -> PathBuf {
	base_dir(
		"DESKBOARD_CONFIG_DIR",
		"XDG_CONFIG_HOME",
		&[".config"],
		".deskboard_config",
	)
}

pub fn default_config_path() -> PathBuf {
	config_dir().join("config.toml")
}

fn base_dir(override_var: &str, xdg_var: &str, home_suffix: &[&str], fallback: &str) -> PathBuf {
	base_dir_from(|name| env::var_os(name), override_var, xdg_var, home_suffix, fallback)
}

fn base_dir_from(
	lookup: impl Fn(&str) -> Option<OsString>,
	override_var: &str,
	xdg_var: &str,
	home_suffix: &[&str],
	fallback: &str,
) -> PathBuf {
	let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

	if let Some(path) = non_empty(override_var) {
		return absolutize(PathBuf::from(path));
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = non_empty("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR_NAME);
		}
	}

	if let Some(path) = non_empty(xdg_var) {
		return PathBuf::from(path).join(APP_DIR_NAME);
	}

	if let Some(path) = non_empty("HOME") {
		let mut path = PathBuf::from(path);
		for segment in home_suffix {
			path.push(segment);
		}
		return path.join(APP_DIR_NAME);
	}

	PathBuf::from(fallback)
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
