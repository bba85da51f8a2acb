use crate::cmd::{parse_hex, parse_item, runtime, QueryArgs};
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: QueryArgs, format: OutputFormat) -> CliResult<i32> {
    let item = parse_item(&args.item)?;
    let params = parse_hex(&args.params)?;
    let network = args.target.network()?;
    let config = args.target.session()?;

    let reply = runtime()?.block_on(async {
        let mut session = netsdr_session::connect(&network, config)
            .await
            .map_err(|err| session_error("connect failed", err))?;
        let reply = session
            .query(item, &params)
            .await
            .map_err(|err| session_error("query failed", err));
        session.disconnect();
        reply
    })?;

    print_reply(&reply, format);
    Ok(if reply.is_nak() { FAILURE } else { SUCCESS })
}
