use crate::cmd::{runtime, TuneArgs};
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: TuneArgs, format: OutputFormat) -> CliResult<i32> {
    let network = args.target.network()?;
    let config = args.target.session()?;

    let reply = runtime()?.block_on(async {
        let mut session = netsdr_session::connect(&network, config)
            .await
            .map_err(|err| session_error("connect failed", err))?;
        let reply = session
            .change_frequency(args.frequency, args.channel)
            .await
            .map_err(|err| session_error("tune failed", err));
        session.disconnect();
        reply
    })?;

    print_reply(&reply, format);
    Ok(if reply.is_nak() { FAILURE } else { SUCCESS })
}
