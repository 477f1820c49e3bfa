use anyhow::{anyhow, Result};

use crate::{AppContext, HistoryArgs, HistoryCommand};
use codexray_core::output::{render_record, summary_line, write_json, write_jsonl, OutputFormat};
use codexray_core::store::{FileStore, RecordStore};

pub(crate) fn handle_history(
    ctx: &AppContext,
    args: HistoryArgs,
    format: OutputFormat,
) -> Result<()> {
    let store = FileStore::new(&ctx.config.server.data_dir);
    match args.command {
        HistoryCommand::List => {
            let records = store.list()?;
            match format {
                OutputFormat::Json => write_json(&records),
                OutputFormat::Jsonl => {
                    for record in &records {
                        write_jsonl("analysis", record)?;
                    }
                    Ok(())
                }
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("no analyses in {}", store.dir().display());
                    }
                    for record in &records {
                        println!("{}", summary_line(record));
                    }
                    Ok(())
                }
            }
        }
        HistoryCommand::Show { id } => {
            let record = store
                .get(&id)?
                .ok_or_else(|| anyhow!("analysis not found: {id}"))?;
            match format {
                OutputFormat::Json => write_json(&record),
                OutputFormat::Jsonl => write_jsonl("analysis", &record),
                OutputFormat::Text => {
                    print!("{}", render_record(&record));
                    Ok(())
                }
            }
        }
        HistoryCommand::Delete { id } => {
            if !store.delete(&id)? {
                return Err(anyhow!("analysis not found: {id}"));
            }
            match format {
                OutputFormat::Json => write_json(&serde_json::json!({ "id": id, "deleted": true })),
                OutputFormat::Jsonl => {
                    write_jsonl("deleted", &serde_json::json!({ "id": id }))
                }
                OutputFormat::Text => {
                    println!("deleted {id}");
                    Ok(())
                }
            }
        }
    }
}
