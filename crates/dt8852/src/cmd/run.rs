use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use dt8852::device::{
    FrequencyWeighting, ModeRequestSet, ModeSetting, Range, RecordingState, TimeWeighting,
};
use tracing::info;

use crate::cmd::{parse_duration, session, LinkArgs, RunArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{EventPrinter, OutputFormat};

/// Settings for a field session: narrow range, slow response, C weighting,
/// with on-device recording started.
fn field_session_modes() -> ModeRequestSet {
    [
        ModeSetting::from(Range::R30To80),
        ModeSetting::from(TimeWeighting::Slow),
        ModeSetting::from(FrequencyWeighting::DbC),
        ModeSetting::from(RecordingState::Recording),
    ]
    .into_iter()
    .collect()
}

pub fn run(args: RunArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let wait = parse_duration(&args.wait)?;
    let idle = parse_duration(&args.idle)?;

    let running = Arc::new(AtomicBool::new(true));
    session::install_ctrlc_handler(running.clone())?;

    let mut device = session::open(link)?;
    let mut printer = EventPrinter::new(format);

    let mut pending = field_session_modes();
    session::apply_modes(&mut device, &mut pending, Instant::now() + wait, &mut printer)?;
    info!("recording started");

    // Interrupting the monitor still stops recording below.
    let monitored = session::monitor(
        &mut device,
        Instant::now() + duration,
        false,
        &running,
        &mut printer,
    );
    printer.finish();
    monitored?;

    let mut stop: ModeRequestSet = [RecordingState::NotRecording].into_iter().collect();
    session::apply_modes(&mut device, &mut stop, Instant::now() + wait, &mut printer)?;
    info!("recording stopped");

    let dumped = session::dump(&mut device, idle, &mut printer);
    printer.finish();
    dumped?;

    Ok(SUCCESS)
}
