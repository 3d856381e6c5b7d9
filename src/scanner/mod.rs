use crate::error::{FleetError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|&e| e == ext.to_string_lossy()))
        .unwrap_or(false)
}

/// フォルダ直下の写真を列挙（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Err(FleetError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image_path(p))
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(images)
}

/// 写真の入力指定（ファイルまたはフォルダ）を展開
///
/// 指定順を保ち、フォルダは中身をファイル名順に展開する。
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(scan_folder(input)?);
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            return Err(FleetError::FileNotFound(input.display().to_string()));
        }
    }
    Ok(paths)
}
