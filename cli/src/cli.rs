//! Command line definition

use catalog::PriceSort;
use clap::{Parser, Subcommand};
use model::ProductId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cartsync")]
#[command(about = "Offline-capable shopping cart client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory holding the cart, cached catalog and settings.json
    #[arg(long, global = true, default_value = ".cartsync")]
    pub data_dir: PathBuf,

    /// Treat the network as unavailable
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh and list the product catalog
    Products {
        /// Only products whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,
        /// price-asc or price-desc
        #[arg(long, default_value = "price-asc", value_parser = parse_sort)]
        sort: PriceSort,
        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Add a product to the cart
    Add {
        product_id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Set the quantity of a cart line; zero or less removes it
    Set {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// Remove a product from the cart
    Remove { product_id: ProductId },
    /// Show the cart
    Show,
    /// Empty the cart
    Clear,
    /// Send the cart to the order endpoint
    Sync {
        /// Empty the cart once the order is accepted
        #[arg(long, default_value_t = false)]
        clear_after: bool,
    },
    /// Watch connectivity and sync automatically until interrupted
    Watch,
}

fn parse_sort(s: &str) -> Result<PriceSort, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_quantity() {
        let cli = Cli::try_parse_from(["cartsync", "add", "7", "--qty", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Add {
                product_id: 7,
                qty: 3
            }
        ));
        assert_eq!(cli.data_dir, PathBuf::from(".cartsync"));
        assert!(!cli.offline);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cartsync", "sync", "--clear-after", "--offline", "--data-dir", "/tmp/x"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Sync { clear_after: true }));
        assert!(cli.offline);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_parse_negative_quantity() {
        let cli = Cli::try_parse_from(["cartsync", "set", "2", "-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Set {
                product_id: 2,
                qty: -1
            }
        ));
    }

    #[test]
    fn test_parse_products_sort() {
        let cli = Cli::try_parse_from(["cartsync", "products", "--sort", "price-desc", "-p", "2"])
            .unwrap();
        match cli.command {
            Commands::Products { sort, page, .. } => {
                assert_eq!(sort, PriceSort::PriceDesc);
                assert_eq!(page, 2);
            }
            other => panic!("Expected Products, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["cartsync", "products", "--sort", "name"]).is_err());
    }
}
