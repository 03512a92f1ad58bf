use std::net::Ipv4Addr;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use iresolve::repl;
use iresolve::resolver::ResolverContext;
use iresolve::transport::UdpTransport;

/// An iterative DNS resolver: walks the delegation hierarchy from a
/// configured root server, starting an interactive lookup shell.
#[derive(Parser)]
#[command(name = "iresolve")]
struct Cli {
    /// IPv4 address of the root nameserver to start resolution from.
    root_server: String,

    /// Debug level. `-p1` restricts the resolver to one non-iterative query
    /// per lookup, with no delegation walk and no CNAME chasing.
    #[arg(short = 'p')]
    debug_level: Option<u8>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let root_server = match cli.root_server.parse::<Ipv4Addr>() {
        Ok(ip) => ip,
        Err(_) => {
            eprintln!("invalid root server address: {}", cli.root_server);
            return ExitCode::from(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, trace_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();

    let transport = match UdpTransport::new() {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("failed to open a UDP socket: {err}");
            return ExitCode::from(1);
        }
    };

    let mut ctx = ResolverContext::new(transport, root_server);
    ctx.single_query_mode = cli.debug_level == Some(1);

    repl::run(&mut ctx, &trace_handle);

    ExitCode::SUCCESS
}
