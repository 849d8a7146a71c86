// Entry point for the ledger CLI. Every command maps onto one core
// operation; errors bubble up here and are reported once.
use alpha_ledger::{
    validate_address, AddressAuthorizer, Blockchain, BlockchainError, Command, Opt, ProofOfWork,
    Transaction, UTXOSet, UtxoIndex, UtxoSource, Wallets, GLOBAL_CONFIG,
};
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use std::process;

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn check_address(role: &str, address: &str) -> Result<(), BlockchainError> {
    if !validate_address(address) {
        return Err(BlockchainError::InvalidAddress(format!(
            "{role} address {address}"
        )));
    }
    Ok(())
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Createblockchain { address } => {
            check_address("genesis", &address)?;
            match Blockchain::create_blockchain(&address) {
                Ok(blockchain) => {
                    if GLOBAL_CONFIG.use_utxo_index() {
                        UtxoIndex::new(blockchain)?.reindex()?;
                    }
                    println!("Done!");
                }
                // Repeated creation is a no-op, not a failure
                Err(BlockchainError::AlreadyExists) => println!("Blockchain already exists"),
                Err(e) => return Err(e.into()),
            }
        }
        Command::Createwallet => {
            let mut wallets = Wallets::new()?;
            let address = wallets.create_wallet()?;
            println!("Your new address: {address}")
        }
        Command::GetBalance { address } => {
            check_address("wallet", &address)?;
            let blockchain = Blockchain::new_blockchain()?;
            let balance = if GLOBAL_CONFIG.use_utxo_index() {
                UtxoIndex::new(blockchain)?.balance(&address)?
            } else {
                UTXOSet::new(blockchain).balance(&address)?
            };
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            let wallets = Wallets::new()?;
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::Send {
            from,
            to,
            amount,
            miner,
            note,
        } => {
            check_address("sender", &from)?;
            check_address("recipient", &to)?;
            check_address("miner", &miner)?;

            let blockchain = Blockchain::new_blockchain()?;
            let utxo_set = UTXOSet::new(blockchain.clone());
            let transfer = Transaction::new_utxo_transaction(
                &from,
                &to,
                amount,
                &utxo_set,
                &AddressAuthorizer,
            )?;
            let reward = GLOBAL_CONFIG.get_reward()?;
            let coinbase = Transaction::new_coinbase_tx(&miner, &note, reward)?;

            let block = blockchain.mine_block(&[coinbase, transfer])?;
            if GLOBAL_CONFIG.use_utxo_index() {
                UtxoIndex::new(blockchain)?.update(&block)?;
            }
            println!("Success!")
        }
        Command::Printchain => {
            let blockchain = Blockchain::new_blockchain()?;
            for block in blockchain.iterator() {
                let block = block?;
                println!("===============================");
                println!("Version: {}", block.get_version());
                println!("Pre block hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
                println!("Tx root: {}", HEXLOWER.encode(block.get_tx_root()));
                println!("Timestamp: {}", block.get_timestamp());
                println!("Bits: {}", block.get_bits());
                println!("Nonce: {}", block.get_nonce());
                println!("Cur block hash: {}", HEXLOWER.encode(block.get_hash()));

                for tx in block.get_transactions() {
                    println!("- Transaction txid_hex: {}", HEXLOWER.encode(tx.get_id()));
                    if tx.is_coinbase() {
                        println!("-- Coinbase note = {}", tx.get_vin()[0].get_unlock_proof());
                    } else {
                        for input in tx.get_vin() {
                            println!(
                                "-- Input txid = {}, vout = {}, from = {}",
                                HEXLOWER.encode(input.get_txid()),
                                input.get_vout(),
                                input.get_unlock_proof(),
                            )
                        }
                    }
                    for output in tx.get_vout() {
                        println!(
                            "-- Output value = {}, to = {}",
                            output.get_value(),
                            output.get_lock_script(),
                        )
                    }
                }
                println!("IsValid: {}", ProofOfWork::validate(&block));
                println!()
            }

            let checked = blockchain.audit()?;
            println!("Audited {checked} blocks");
        }
        Command::Reindexutxo => {
            let blockchain = Blockchain::new_blockchain()?;
            let utxo_index = UtxoIndex::new(blockchain)?;
            utxo_index.reindex()?;
            let count = utxo_index.count_transactions()?;
            println!("Done! There are {count} transactions in the UTXO set.");
        }
    }
    Ok(())
}
