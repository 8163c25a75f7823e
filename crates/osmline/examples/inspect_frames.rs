//! Simple dumper for osmline frame files.

use std::fs;

use osmline::{read_frames, Record};

fn format_tags(record: &Record) -> String {
    let mut tags: Vec<_> = record.meta().tags.iter().collect();
    tags.sort();
    tags.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_record(record: &Record) -> String {
    let detail = match record {
        Record::Node(n) => format!("({:.7}, {:.7})", n.lat, n.lon),
        Record::Way(w) => {
            let preview: Vec<&str> = w.nodes.iter().take(6).map(String::as_str).collect();
            if w.nodes.len() > 6 {
                format!("[{} ... +{}]", preview.join(" "), w.nodes.len() - 6)
            } else {
                format!("[{}]", preview.join(" "))
            }
        }
        Record::Relation(r) => format!("{} members", r.members.len()),
    };
    format!("{:<12} {} {{{}}}", record.reference(), detail, format_tags(record))
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "out.osmb".to_string());

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let batches = read_frames(&data).expect("Failed to decode");
    println!("\n=== Frames ({}) ===", batches.len());

    let (mut nodes, mut ways, mut relations) = (0, 0, 0);
    for (i, batch) in batches.iter().enumerate() {
        println!(
            "  #{}: {} nodes, {} ways, {} relations",
            i,
            batch.nodes.len(),
            batch.ways.len(),
            batch.relations.len()
        );
        nodes += batch.nodes.len();
        ways += batch.ways.len();
        relations += batch.relations.len();
    }

    println!("\n=== Records ===");
    for record in batches.into_iter().flat_map(|b| b.into_records()).take(50) {
        println!("  {}", format_record(&record));
    }

    println!("\n=== Summary ===");
    println!("Nodes:     {}", nodes);
    println!("Ways:      {}", ways);
    println!("Relations: {}", relations);
}
