//! Article operations: create, move, delete, list, sizes.

use anyhow::Result;
use ordo_core::allocator::SequenceAllocator;
use ordo_core::category::Category;
use ordo_core::store::ArticleDraft;
use uuid::Uuid;

pub fn create(
    allocator: &SequenceAllocator,
    owner: Uuid,
    category: Category,
    title: String,
    body: String,
) -> Result<()> {
    let article = allocator.create(
        owner,
        ArticleDraft {
            category,
            title,
            body,
        },
    )?;
    println!(
        "created {} in {} at seq {}",
        article.article_id, article.category, article.seq
    );
    Ok(())
}

pub fn move_article(
    allocator: &SequenceAllocator,
    owner: Uuid,
    article: Uuid,
    category: Category,
) -> Result<()> {
    let moved = allocator.move_article(owner, article, category)?;
    println!(
        "moved {} to {} at seq {}",
        moved.article_id, moved.category, moved.seq
    );
    Ok(())
}

pub fn delete(allocator: &SequenceAllocator, owner: Uuid, article: Uuid) -> Result<()> {
    allocator.delete(owner, article)?;
    println!("deleted {article}");
    Ok(())
}

pub fn list(allocator: &SequenceAllocator, owner: Uuid, category: Category) -> Result<()> {
    let group = allocator.list_group(owner, category)?;
    if group.is_empty() {
        println!("no articles in {category} for {owner}");
        return Ok(());
    }
    for article in group {
        println!("{:>4}  {}  {}", article.seq, article.article_id, article.title);
    }
    Ok(())
}

pub fn sizes(allocator: &SequenceAllocator, owner: Uuid) -> Result<()> {
    let sizes = allocator.category_sizes(owner)?;
    for (category, size) in sizes {
        println!("{:>4}  {}", size, category.display_name());
    }
    Ok(())
}
