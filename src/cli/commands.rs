use clap::{Parser, Subcommand};
use serde_json::Value;
use std::str::FromStr;

/// A positional RPC argument: JSON when it parses as JSON, a plain string otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonArg(pub Value);

impl FromStr for JsonArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JsonArg(
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())),
        ))
    }
}

#[derive(Debug, Parser)]
#[command(name = "golos-call", about = "Golos node client and key tool")]
pub struct Opt {
    /// Node url to use instead of the configured list (repeatable)
    #[arg(long = "node", global = true)]
    pub nodes: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "call", about = "Call an API method and print the JSON result")]
    Call {
        #[arg(help = "Method name, e.g. get_dynamic_global_properties")]
        method: String,
        #[arg(help = "Positional arguments, each parsed as JSON when possible")]
        args: Vec<JsonArg>,
    },
    #[command(name = "keys", about = "Derive every role key for an account password")]
    Keys {
        #[arg(help = "Account name")]
        account: String,
        #[arg(help = "Account password")]
        password: String,
    },
    #[command(name = "pubkey", about = "Print the public key of a WIF private key")]
    Pubkey {
        #[arg(help = "WIF private key")]
        wif: String,
    },
    #[command(name = "iskey", about = "Check that a WIF private key matches a public key")]
    Iskey {
        #[arg(help = "WIF private key")]
        wif: String,
        #[arg(help = "Public key text")]
        public: String,
    },
    #[command(name = "txid", about = "Compute the id of a JSON transaction locally")]
    Txid {
        #[arg(help = "Transaction JSON")]
        tx: String,
    },
    #[command(name = "txhex", about = "Serialize a JSON transaction to hex locally")]
    Txhex {
        #[arg(help = "Transaction JSON")]
        tx: String,
        #[arg(long, help = "Leave the signatures out")]
        remove_signatures: bool,
    },
    #[command(name = "gettx", about = "Fetch a transaction by id")]
    GetTransaction {
        #[arg(help = "Transaction id")]
        txid: String,
    },
    #[command(name = "transfer", about = "Sign and broadcast a transfer")]
    Transfer {
        #[arg(long, help = "Sending account")]
        from: String,
        #[arg(long, help = "Receiving account")]
        to: String,
        #[arg(long, help = "Amount, e.g. \"0.100 GOLOS\" or 0.1 with --asset")]
        amount: String,
        #[arg(long, default_value = "GOLOS", help = "Asset symbol for bare amounts")]
        asset: String,
        #[arg(long, default_value = "", help = "Transfer memo")]
        memo: String,
        #[arg(long, help = "Active WIF of the sending account")]
        wif: String,
    },
}
