use std::env;
use std::process;

use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::ReadService;
use domain::{seed, CoreError, Criteria, Entity, Lookup};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain list <kunden|vereine>\n  domain search <kunden|vereine> <key=value>...\n  domain names <kunden|vereine> <prefix>\n\nNotes:\n  - This demo CLI reads the seed data from an in-memory store; nothing is persisted.",
        domain::about()
    );
}

fn print_all<E: Entity>(entities: &[E]) {
    for e in entities {
        let id = e.id().map(|id| id.to_string()).unwrap_or_default();
        println!("{}  {:<10} {}", id, e.name(), e.email());
    }
}

fn run_on<E: Entity>(svc: ReadService<E, InMemoryRepo<E>>, cmd: &str, rest: &[String]) -> Result<(), String> {
    match cmd {
        "list" => {
            let all = svc.find_all().map_err(|e| format!("list failed: {}", e))?;
            print_all(&all);
            Ok(())
        }
        "search" => {
            let mut criteria = Criteria::new();
            for pair in rest {
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(format!("expected key=value, got: {}", pair));
                };
                criteria.insert(key, value);
            }
            match svc.find(&criteria) {
                Ok(found) => {
                    print_all(&found);
                    Ok(())
                }
                Err(CoreError::NotFound(Lookup::Criteria(c))) => Err(format!("nothing found for {}", c)),
                Err(e) => Err(format!("search failed: {}", e)),
            }
        }
        "names" => {
            let prefix = rest.first().map(String::as_str).unwrap_or_default();
            let names = svc
                .find_names_by_prefix(prefix)
                .map_err(|e| format!("names failed: {}", e))?;
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        unk => Err(format!("unknown command: {}", unk)),
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();

    let (Some(cmd), Some(kind)) = (args.first(), args.get(1)) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];

    match kind.as_str() {
        "kunden" => run_on(ReadService::new(InMemoryRepo::with_seed(seed::kunden())), cmd, rest),
        "vereine" => run_on(ReadService::new(InMemoryRepo::with_seed(seed::vereine())), cmd, rest),
        other => Err(format!("unknown entity kind: {}", other)),
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
