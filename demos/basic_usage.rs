//! Basic usage example for the acorn-store-rs client.

use acorn_store_rs::{Database, ErrorKind, RequestError};
use std::error::Error;

const HOST: &str = "127.0.0.1";
const PORT: u16 = 9000;
const DATABASE: &str = "mydb";
const USER: &str = "alice";
const PASSWORD: &str = "secret";
const COLLECTION: &str = "people";

/// Connects and authenticates against the document store.
async fn example_connection() -> Result<Database, Box<dyn Error>> {
    let conn_string = format!(
        "acorn-store://{}:{}/{}/{}:{}?request_timeout=30",
        HOST, PORT, DATABASE, USER, PASSWORD
    );
    let db = Database::connect(&conn_string).await?;
    Ok(db)
}

/// Creates a collection, writes a few documents and reads them back.
async fn example_documents(db: &Database) -> Result<String, Box<dyn Error>> {
    // Ignore the error if the collection already exists
    let people = match db.create_collection(COLLECTION).await {
        Ok(collection) => collection,
        Err(RequestError::CreateCollectionFailed { .. }) => db.collection(COLLECTION),
        Err(e) => return Err(e.into()),
    };

    people.insert(r#"{"name":"Alice","age":31}"#).await?;
    people.insert(r#"{"name":"Bob","age":27}"#).await?;
    people.insert(r#"{"name":"Charlie","age":45}"#).await?;

    people.update("name==Bob", "age", "28").await?;
    people.delete("name==Charlie").await?;

    let all = people.retrieve("").await?;

    people.drop().await?;
    Ok(all)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let db = example_connection().await?;
    println!("Connected: {}", db);

    println!("Collections: {}", db.list_collections().await?);
    println!("Grants: {}", db.list_user_grants().await?);

    match example_documents(&db).await {
        Ok(documents) => println!("Documents: {}", documents),
        Err(e) => match e.downcast_ref::<RequestError>() {
            Some(err) if err.kind() == ErrorKind::MalformedReply => {
                println!("Server sent malformed JSON: {:?}", err.raw_reply())
            }
            _ => return Err(e),
        },
    }

    db.close().await?;
    println!("Done");

    Ok(())
}
