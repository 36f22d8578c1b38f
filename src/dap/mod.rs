mod protocol;
mod server;

pub use protocol::{
    read_message, shared_writer, DapMessage, DapMessageContent, LaunchArguments, MessageWriter,
    SharedWriter,
};
pub use server::DebugServer;

use std::io;

/// Read DAP requests from stdin until the client disconnects or the stream
/// ends, dispatching each to the session.
pub fn run_dap_mode() -> io::Result<()> {
    eprintln!("DAP server starting...");

    let mut server = DebugServer::new();

    loop {
        let msg = match read_message() {
            Some(msg) => msg,
            None => break,
        };

        match msg.content {
            DapMessageContent::Request { command, arguments } => match command.as_str() {
                "initialize" => server.handle_initialize(msg.seq, command),
                "launch" | "attach" => server.handle_launch(msg.seq, command, arguments),
                "setBreakpoints" => server.handle_set_breakpoints(msg.seq, command, arguments),
                "configurationDone" => server.respond_ok(msg.seq, command),
                "threads" => server.handle_threads(msg.seq, command),
                "stackTrace" => server.handle_stack_trace(msg.seq, command),
                "scopes" => server.handle_scopes(msg.seq, command),
                "variables" => server.handle_variables(msg.seq, command),
                "next" => server.handle_next(msg.seq, command),
                "stepIn" => server.handle_step_in(msg.seq, command),
                "stepOut" => server.handle_step_out(msg.seq, command),
                "evaluate" => server.handle_evaluate(msg.seq, command, arguments),
                "restart" => server.handle_restart(msg.seq, command),
                "disconnect" => {
                    server.handle_disconnect(msg.seq, command);
                    break;
                }
                _ => {
                    eprintln!("Unhandled DAP command: {}", command);
                    server.respond_fail(msg.seq, command);
                }
            },
            _ => {
                eprintln!("Ignoring non-request message");
            }
        }
    }

    Ok(())
}
