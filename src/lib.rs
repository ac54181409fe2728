mod api;
mod capture;
mod card;
mod config;
mod decode;
mod flow;
mod models;
mod utils;

use std::sync::Arc;

use api::{commands::lookup_room, InventoryClient};
use capture::{
    commands::{get_scanner_status, retry_scanner, start_scanner, stop_scanner},
    CaptureConfig, CaptureEvent, PlatformCamera, ScannerController,
};
use config::{ScannerSettings, SettingsStore};
use decode::QrDecoder;
use flow::{
    commands::{get_flow_state, resolve_code, scan_again},
    FlowState, ScanFlow,
};
use log::{info, warn};
use tauri::{AppHandle, Emitter, Manager, State, WindowEvent};
use tokio::sync::{mpsc, watch, Mutex};

pub(crate) type Scanner = ScannerController<PlatformCamera, QrDecoder>;

pub(crate) struct AppState {
    pub(crate) scanner: Mutex<Scanner>,
    pub(crate) flow: ScanFlow<InventoryClient>,
    pub(crate) api: Arc<InventoryClient>,
    pub(crate) settings: SettingsStore,
}

#[tauri::command]
fn get_scanner_settings(state: State<AppState>) -> Result<ScannerSettings, String> {
    Ok(state.settings.settings())
}

#[tauri::command]
async fn set_scanner_settings(
    settings: ScannerSettings,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<(), String> {
    state
        .settings
        .update(settings.clone())
        .map_err(|e| e.to_string())?;

    state.api.set_base_url(state.settings.api_base_url());
    state.scanner.lock().await.set_inversion(settings.inversion);

    app_handle
        .emit("scanner-settings-updated", &settings)
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Push capture events to the webview and hand decoded payloads to the flow.
async fn forward_capture_events(
    app_handle: AppHandle,
    mut events: mpsc::UnboundedReceiver<CaptureEvent>,
    flow: ScanFlow<InventoryClient>,
) {
    while let Some(event) = events.recv().await {
        if let Err(err) = app_handle.emit("scanner-event", &event) {
            warn!("Failed to emit scanner event: {err}");
        }

        if let CaptureEvent::Decoded { payload, .. } = event {
            let flow = flow.clone();
            tauri::async_runtime::spawn(async move {
                if let Err(err) = flow.resolve(payload).await {
                    warn!("Ignoring decoded payload: {err}");
                }
            });
        }
    }
}

async fn forward_flow_states(app_handle: AppHandle, mut states: watch::Receiver<FlowState>) {
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        if let Err(err) = app_handle.emit("flow-state-changed", &state) {
            warn!("Failed to emit flow state: {err}");
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Inventory scanner starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
                let initial_settings = settings_store.settings();

                let api = Arc::new(InventoryClient::new(settings_store.api_base_url()));
                info!("Inventory service at {}", api.base_url());
                let flow = ScanFlow::new(Arc::clone(&api));

                let (event_tx, event_rx) = mpsc::unbounded_channel();
                let config = CaptureConfig {
                    inversion: initial_settings.inversion,
                    ..CaptureConfig::default()
                };
                let scanner =
                    ScannerController::new(PlatformCamera::new(), QrDecoder::new(), config, event_tx);

                tauri::async_runtime::spawn(forward_capture_events(
                    app.handle().clone(),
                    event_rx,
                    flow.clone(),
                ));
                tauri::async_runtime::spawn(forward_flow_states(
                    app.handle().clone(),
                    flow.subscribe(),
                ));

                app.manage(AppState {
                    scanner: Mutex::new(scanner),
                    flow,
                    api,
                    settings: settings_store,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                let app_handle = window.app_handle().clone();
                tauri::async_runtime::block_on(async move {
                    let Some(state) = app_handle.try_state::<AppState>() else {
                        return;
                    };
                    let mut scanner = state.scanner.lock().await;
                    if let Err(err) = scanner.stop().await {
                        warn!("Failed to stop scanner on window close: {err}");
                    }
                });
            }
        })
        .invoke_handler(tauri::generate_handler![
            start_scanner,
            stop_scanner,
            retry_scanner,
            get_scanner_status,
            resolve_code,
            scan_again,
            get_flow_state,
            lookup_room,
            get_scanner_settings,
            set_scanner_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
