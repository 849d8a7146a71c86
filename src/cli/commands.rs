use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "alpha-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new blockchain")]
    Createblockchain {
        #[arg(help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(
        name = "getbalance",
        about = "Get the wallet balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(name = "send", about = "Send coins and mine the block holding the transfer")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: f64,
        #[arg(help = "Address receiving the block reward")]
        miner: String,
        #[arg(help = "Note stored in the coinbase transaction")]
        note: String,
    },
    #[command(name = "printchain", about = "Print all blocks in the blockchain")]
    Printchain,
    #[command(name = "reindexutxo", about = "Rebuild UTXO index set")]
    Reindexutxo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let opt = Opt::try_parse_from([
            "alpha-ledger",
            "send",
            "M1",
            "P1",
            "5.0",
            "M1",
            "hello",
        ])
        .unwrap();

        match opt.command {
            Command::Send {
                from,
                to,
                amount,
                miner,
                note,
            } => {
                assert_eq!(from, "M1");
                assert_eq!(to, "P1");
                assert_eq!(amount, 5.0);
                assert_eq!(miner, "M1");
                assert_eq!(note, "hello");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_numeric_amount() {
        let result =
            Opt::try_parse_from(["alpha-ledger", "send", "M1", "P1", "lots", "M1", "hello"]);
        assert!(result.is_err());
    }
}
