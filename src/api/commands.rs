use tauri::State;

use crate::models::RoomRecord;
use crate::AppState;

#[tauri::command]
pub async fn lookup_room(state: State<'_, AppState>, uid: String) -> Result<RoomRecord, String> {
    state.api.scan_room(uid.trim()).await.map_err(|e| e.to_string())
}
