use tauri::State;

use crate::flow::FlowState;
use crate::AppState;

#[tauri::command]
pub async fn get_flow_state(state: State<'_, AppState>) -> Result<FlowState, String> {
    Ok(state.flow.state().await)
}

/// Manual entry path; decoded payloads reach the flow through the capture
/// event forwarder instead.
#[tauri::command]
pub async fn resolve_code(state: State<'_, AppState>, code: String) -> Result<FlowState, String> {
    {
        let mut scanner = state.scanner.lock().await;
        scanner.stop().await.map_err(|e| e.to_string())?;
    }
    state.flow.resolve(code).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn scan_again(state: State<'_, AppState>) -> Result<FlowState, String> {
    let flow_state = state.flow.scan_again().await;
    state
        .scanner
        .lock()
        .await
        .retry()
        .await
        .map_err(|e| e.to_string())?;
    Ok(flow_state)
}
