use netsdr_frame::expand_samples;

use crate::cmd::{parse_width, InspectArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_inspect, InspectReport, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let width = parse_width(args.width)?;
    let bytes = std::fs::read(&args.path)
        .map_err(|err| io_error(&format!("failed reading {}", args.path.display()), err))?;
    let samples = expand_samples(&bytes, width.bits())
        .map_err(|err| frame_error("cannot decode samples", err))?;

    let report = InspectReport {
        path: args.path.display().to_string(),
        sample_bits: width.bits(),
        samples: samples.len(),
        trailing_bytes: bytes.len() % width.bytes(),
        min: samples.iter().copied().min(),
        max: samples.iter().copied().max(),
        head: samples.iter().copied().take(args.head).collect(),
    };
    print_inspect(&report, format);
    Ok(SUCCESS)
}
