use std::time::Instant;

use dt8852::device::{ModeRequestSet, ModeSetting};

use crate::cmd::{parse_duration, session, LinkArgs, SetModeArgs};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{EventPrinter, OutputFormat};

pub fn run(args: SetModeArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut pending = requested(&args);
    if pending.is_empty() {
        return Err(CliError::new(
            USAGE,
            "nothing to set; pass at least one of --range, --time, --weighting, --record",
        ));
    }
    let wait = parse_duration(&args.wait)?;

    let mut device = session::open(link)?;
    let mut printer = EventPrinter::new(format);
    session::apply_modes(&mut device, &mut pending, Instant::now() + wait, &mut printer)?;

    Ok(SUCCESS)
}

fn requested(args: &SetModeArgs) -> ModeRequestSet {
    [
        args.range.map(ModeSetting::from),
        args.time.map(ModeSetting::from),
        args.weighting.map(ModeSetting::from),
        args.record.map(ModeSetting::from),
    ]
    .into_iter()
    .flatten()
    .collect()
}
