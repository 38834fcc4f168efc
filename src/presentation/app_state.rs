// Application state for HTTP handlers
use crate::application::report_service::ReportService;
use crate::application::timer_stream_service::TimerStreamService;

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub timer_stream_service: TimerStreamService,
}
