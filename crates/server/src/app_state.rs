use server_api::ThemeService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ThemeService,
}
