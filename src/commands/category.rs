use clap::{Args, Subcommand};
use fitvault_core::{Category, LocalStore, Subcategory};
use uuid::Uuid;

use super::{confirm, finish_write, OutputFormat};

#[derive(Args)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand)]
pub enum CategorySubcommand {
    /// Create a category
    Add {
        /// Category name
        name: String,
    },

    /// Create a subcategory under an existing category
    AddSub {
        /// Parent category ID (UUID) or name
        #[arg(long)]
        category: String,

        /// Subcategory name
        name: String,
    },

    /// List categories and their subcategories
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a category with its subcategories
    Delete {
        /// Category ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(serde::Serialize)]
struct CategoryListing<'a> {
    #[serde(flatten)]
    category: &'a Category,
    subcategories: Vec<&'a Subcategory>,
}

impl CategoryCommand {
    pub async fn run<L: LocalStore>(&self, store: &mut L) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CategorySubcommand::Add { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("Category name cannot be empty".into());
                }
                let categories = store.categories().await?;
                if categories.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
                    return Err(format!("Category already exists: {}", name).into());
                }

                let category = Category::new(name);
                let staged = store.insert_category(&category).await;
                finish_write(store, staged).await?;
                println!("Created category: {}", category);
                Ok(())
            }

            CategorySubcommand::AddSub { category, name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("Subcategory name cannot be empty".into());
                }
                let parent = find_category(store, category).await?;
                let subcategories = store.subcategories().await?;
                if subcategories
                    .iter()
                    .any(|s| s.category_id == parent.id && s.name.eq_ignore_ascii_case(name))
                {
                    return Err(format!(
                        "Subcategory already exists: {} / {}",
                        parent.name, name
                    )
                    .into());
                }

                let subcategory = Subcategory::new(name, parent.id);
                let staged = store.insert_subcategory(&subcategory).await;
                finish_write(store, staged).await?;
                println!("Created subcategory: {} / {}", parent.name, subcategory);
                Ok(())
            }

            CategorySubcommand::List { format } => {
                let categories = store.categories().await?;
                let subcategories = store.subcategories().await?;

                if categories.is_empty() {
                    println!("No categories found");
                    return Ok(());
                }

                let listings: Vec<CategoryListing> = categories
                    .iter()
                    .map(|category| CategoryListing {
                        category,
                        subcategories: subcategories
                            .iter()
                            .filter(|s| s.category_id == category.id)
                            .collect(),
                    })
                    .collect();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&listings)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  NAME", "ID");
                        println!("{}", "-".repeat(60));
                        for listing in &listings {
                            println!("{:<36}  {}", listing.category.id, listing.category.name);
                            for sub in &listing.subcategories {
                                println!("{:<36}    - {}", sub.id, sub.name);
                            }
                        }
                        println!("\nTotal: {} category(ies)", listings.len());
                    }
                }
                Ok(())
            }

            CategorySubcommand::Delete { identifier, force } => {
                let category = find_category(store, identifier).await?;

                if !force
                    && !confirm(&format!(
                        "Delete category '{}' and its subcategories?",
                        category.name
                    ))?
                {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let staged = store.delete_category(category.id).await;
                finish_write(store, staged).await?;
                println!("Deleted category: {}", category.name);
                Ok(())
            }
        }
    }
}

/// Looks a category up by UUID first, then by case-insensitive name.
pub(crate) async fn find_category<L: LocalStore>(
    store: &mut L,
    identifier: &str,
) -> Result<Category, Box<dyn std::error::Error>> {
    let categories = store.categories().await?;
    let found = match Uuid::parse_str(identifier) {
        Ok(id) => categories.into_iter().find(|c| c.id == id),
        Err(_) => categories
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(identifier.trim())),
    };
    found.ok_or_else(|| format!("Category not found: {}", identifier).into())
}
