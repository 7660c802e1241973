// Entry point for the golos-call command-line tool
use clap::Parser;
use golos_core::{
    derive_keys, get_transaction, is_key_with_prefix, public_from_wif_with_prefix, Asset, Command, Config,
    Operation, Opt, PrivateKey, Transaction, TransactionBuilder, WsClient, GLOBAL_CONFIG,
};
use log::{error, LevelFilter};
use serde_json::{json, Value};
use std::process;

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let mut config: Config = GLOBAL_CONFIG.clone();
    if !opt.nodes.is_empty() {
        config.nodes = opt.nodes;
        config.validate()?;
    }

    match opt.command {
        Command::Call { method, args } => {
            let mut client = WsClient::new(&config)?;
            let params: Vec<Value> = args.into_iter().map(|arg| arg.0).collect();
            let result = client.call(&method, params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Keys { account, password } => {
            let keys = derive_keys(&account, &password)?;
            for pair in keys.iter() {
                println!("{:<8} {} {}", pair.role().as_str(), pair.wif(), pair.public_text());
            }
        }
        Command::Pubkey { wif } => {
            println!("{}", public_from_wif_with_prefix(&wif, &config.address_prefix)?);
        }
        Command::Iskey { wif, public } => {
            // exit status carries the answer for scripts
            let matches = is_key_with_prefix(&wif, &public, &config.address_prefix);
            println!("{matches}");
            if !matches {
                process::exit(2);
            }
        }
        Command::Txid { tx } => {
            let tx = Transaction::from_json(serde_json::from_str(&tx)?)?;
            println!("{}", tx.id()?);
        }
        Command::Txhex {
            tx,
            remove_signatures,
        } => {
            let tx = Transaction::from_json(serde_json::from_str(&tx)?)?;
            println!("{}", tx.to_hex(remove_signatures)?);
        }
        Command::GetTransaction { txid } => {
            let mut client = WsClient::new(&config)?;
            let tx = get_transaction(&mut client, &txid)?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::Transfer {
            from,
            to,
            amount,
            asset,
            memo,
            wif,
        } => {
            let amount = if amount.contains(char::is_whitespace) {
                Asset::parse(&amount)?
            } else {
                Asset::from_decimal(&amount, &asset)?
            };
            let key = PrivateKey::from_wif(&wif)?;
            let op = Operation::from_value(
                "transfer",
                json!({
                    "from": from,
                    "to": to,
                    "amount": amount.to_string(),
                    "memo": memo,
                }),
            )?;

            let builder = TransactionBuilder::from_config(&config)?;
            let mut client = WsClient::new(&config)?;
            let result = builder.finalize(&mut client, vec![op], &[key])?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}
