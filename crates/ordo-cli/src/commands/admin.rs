//! Database and owner administration.

use std::path::Path;

use anyhow::Result;
use ordo_core::allocator::SequenceAllocator;
use uuid::Uuid;

pub fn init(_allocator: &SequenceAllocator, db_path: &Path) -> Result<()> {
    // Opening the store already applied the schema.
    println!("initialized database at {}", db_path.display());
    Ok(())
}

pub fn add_owner(allocator: &SequenceAllocator, id: Option<Uuid>, name: &str) -> Result<()> {
    let owner = allocator.register_owner(id, name)?;
    println!("registered owner {} ({})", owner.owner_id, owner.display_name);
    Ok(())
}
