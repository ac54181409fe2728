use tauri::State;

use crate::capture::SessionStatus;
use crate::AppState;

#[tauri::command]
pub async fn start_scanner(state: State<'_, AppState>) -> Result<String, String> {
    state.scanner.lock().await.start().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_scanner(state: State<'_, AppState>) -> Result<(), String> {
    state
        .scanner
        .lock()
        .await
        .stop()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn retry_scanner(state: State<'_, AppState>) -> Result<String, String> {
    state
        .scanner
        .lock()
        .await
        .retry()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_scanner_status(state: State<'_, AppState>) -> Result<SessionStatus, String> {
    Ok(state.scanner.lock().await.status())
}
