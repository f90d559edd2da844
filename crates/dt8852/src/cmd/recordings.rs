use crate::cmd::{parse_duration, session, LinkArgs, RecordingsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{EventPrinter, OutputFormat};

pub fn run(args: RecordingsArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let idle = parse_duration(&args.idle)?;
    let mut device = session::open(link)?;
    let mut printer = EventPrinter::new(format);
    let result = session::dump(&mut device, idle, &mut printer);
    printer.finish();
    result?;
    Ok(SUCCESS)
}
