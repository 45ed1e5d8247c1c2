use mongodb::{
    Database, IndexModel,
    bson::doc,
    options::IndexOptions,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique email
    {
        let col = db.collection::<mongodb::bson::Document>("users");
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // pending_orders: monitor scan (status + user) and per-user listing
    {
        let col = db.collection::<mongodb::bson::Document>("pending_orders");
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "user_id": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // trades: query by user and sort by opened_at desc
    {
        let col = db.collection::<mongodb::bson::Document>("trades");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "opened_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // quotas: one counter per (user, kind, day)
    {
        let col = db.collection::<mongodb::bson::Document>("quotas");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "kind": 1, "day": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // whale_events: feed is newest-first
    {
        let col = db.collection::<mongodb::bson::Document>("whale_events");
        let model = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .build();

        let _ = col.create_index(model, None).await;
    }

    Ok(())
}
