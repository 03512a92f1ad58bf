//! The interactive command shell: a thin, line-oriented loop over stdin
//! that calls into a `ResolverContext`.

use std::io::{self, BufRead, Write};
use std::net::Ipv4Addr;
use std::str::FromStr;

use tracing_subscriber::reload;
use tracing_subscriber::EnvFilter;

use crate::codec::{DomainName, RecordType};
use crate::display::print_records;
use crate::resolver::ResolverContext;
use crate::transport::Transport;

/// Run the REPL to completion (`quit`/`exit`, or EOF on stdin).
pub fn run<T: Transport>(
    ctx: &mut ResolverContext<T>,
    trace_handle: &reload::Handle<EnvFilter, tracing_subscriber::Registry>,
) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = strip_comment(&line).trim();
        if command.is_empty() {
            continue;
        }

        match dispatch(command, ctx, trace_handle) {
            Dispatch::Continue => {}
            Dispatch::Quit => break,
        }
        let _ = io::stdout().flush();
    }
}

enum Dispatch {
    Continue,
    Quit,
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn dispatch<T: Transport>(
    command: &str,
    ctx: &mut ResolverContext<T>,
    trace_handle: &reload::Handle<EnvFilter, tracing_subscriber::Registry>,
) -> Dispatch {
    let mut words = command.split_whitespace();
    let Some(verb) = words.next() else {
        return Dispatch::Continue;
    };

    match verb {
        "lookup" | "l" => {
            let Some(name) = words.next() else {
                eprintln!("usage: lookup <name> [type]");
                return Dispatch::Continue;
            };
            let rtype = match words.next() {
                Some(raw) => match RecordType::from_str(raw) {
                    Ok(rtype) => rtype,
                    Err(_) => {
                        eprintln!("usage: lookup <name> [A|NS|CNAME|MX|AAAA]");
                        return Dispatch::Continue;
                    }
                },
                None => RecordType::A,
            };
            let name = DomainName::from_dotted(name);
            let rrs = ctx.resolve(&name, rtype);
            print_records(&name, rtype, &rrs);
        }
        "trace" => match words.next() {
            Some("on") => {
                ctx.trace = true;
                set_filter(trace_handle, "debug");
            }
            Some("off") => {
                ctx.trace = false;
                set_filter(trace_handle, "info");
            }
            _ => eprintln!("usage: trace on|off"),
        },
        "server" => {
            let Some(addr) = words.next() else {
                eprintln!("usage: server <ip>");
                return Dispatch::Continue;
            };
            match addr.parse::<Ipv4Addr>() {
                Ok(ip) => ctx.root_server = ip,
                Err(_) => eprintln!("invalid address: {addr}"),
            }
        }
        "dump" => {
            let mut entries = Vec::new();
            ctx.cache.for_each(|name, rtype, rrs| {
                entries.push((name.clone(), rtype, rrs.to_vec()));
            });
            for (name, rtype, rrs) in entries {
                print_records(&name, rtype, &rrs);
            }
        }
        "quit" | "exit" => return Dispatch::Quit,
        other => eprintln!("unknown command: {other}"),
    }

    Dispatch::Continue
}

fn set_filter(handle: &reload::Handle<EnvFilter, tracing_subscriber::Registry>, directive: &str) {
    if let Err(err) = handle.modify(|filter| *filter = EnvFilter::new(directive)) {
        eprintln!("failed to change log verbosity: {err}");
    }
}
