use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::cmd::{parse_duration, session, LinkArgs, MonitorArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{EventPrinter, OutputFormat};

pub fn run(args: MonitorArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;

    let running = Arc::new(AtomicBool::new(true));
    session::install_ctrlc_handler(running.clone())?;

    let mut device = session::open(link)?;
    let mut printer = EventPrinter::new(format);
    let result = session::monitor(
        &mut device,
        Instant::now() + duration,
        args.all,
        &running,
        &mut printer,
    );
    printer.finish();

    let printed = result?;
    info!(printed, "monitor finished");
    Ok(SUCCESS)
}
