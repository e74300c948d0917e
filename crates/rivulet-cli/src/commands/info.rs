//! Report buffer capabilities of this platform.

use clap::Args;
use rivulet_core::buffer::allocate_double_mapped;
use rivulet_core::{granularity_items, page_size};

/// Item sizes shown in the granularity table.
const ITEM_SIZES: &[usize] = &[1, 2, 4, 8, 12, 16, 24];

#[derive(Args)]
pub struct InfoArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let page = page_size();
    let double_mapping = allocate_double_mapped(page).map(|region| region.backend());
    let granularity: Vec<(usize, usize)> = ITEM_SIZES
        .iter()
        .map(|&size| (size, granularity_items(size, page)))
        .collect();

    if args.json {
        let json = serde_json::json!({
            "page_size": page,
            "double_mapped": double_mapping.is_ok(),
            "backend": double_mapping.as_ref().ok(),
            "unavailable_reason": double_mapping.as_ref().err().map(ToString::to_string),
            "granularity": granularity.iter().map(|(size, items)| serde_json::json!({
                "item_size": size,
                "items": items,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Page size:      {page} bytes");
    match &double_mapping {
        Ok(backend) => println!("Double-mapped:  yes ({backend})"),
        Err(e) => println!("Double-mapped:  no ({e})"),
    }
    println!();
    println!("Buffer granularity (smallest whole-page item count):");
    for (size, items) in &granularity {
        println!("  {size:>3}-byte items  {items:>6} items");
    }
    Ok(())
}
