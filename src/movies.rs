use std::collections::{BTreeSet, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Func, IntoCondition, LikeExpr, SimpleExpr},
};
use tracing::{debug, warn};

use crate::{
    entities::{connection, movie},
    error::{AppError, AppResult},
    models::{self, BulkOutcome, MAX_YEAR, MIN_YEAR, Movie, MovieCreate, MovieUpdate},
    now_sec,
};

pub const SEARCH_LIMIT: u64 = 50;

/// Shortest all-digit token treated as a TMDB id rather than part of a title.
const MIN_TMDB_TOKEN_LEN: usize = 5;

/// CRUD and search over the `movie` table.
#[derive(Clone)]
pub struct MovieRepository {
    db: DatabaseConnection,
}

impl MovieRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: MovieCreate) -> AppResult<Movie> {
        new.validate()?;
        ensure_connection(&self.db, new.connection_id).await?;
        ensure_arr_id_free(&self.db, new.connection_id, new.arr_id).await?;

        let movie = insert_movie(&self.db, new).await?;
        debug!(movie_id = movie.id, arr_id = movie.arr_id, title = %movie.title, "movie created");
        Ok(movie)
    }

    /// Inserts every movie or none of them.
    pub async fn create_bulk(&self, items: Vec<MovieCreate>) -> AppResult<Vec<Movie>> {
        for item in &items {
            item.validate()?;
        }
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert((item.connection_id, item.arr_id)) {
                return Err(AppError::movie_exists(item.connection_id, item.arr_id));
            }
        }

        let total = items.len();
        let txn = self.db.begin().await?;
        match insert_all(&txn, items).await {
            Ok(created) => {
                txn.commit().await?;
                debug!(count = total, "movies created in bulk");
                Ok(created)
            },
            Err(err) => {
                txn.rollback().await?;
                warn!(count = total, error = %err, "bulk create rolled back");
                Err(err)
            },
        }
    }

    /// Inserts new movies and refreshes the ones already known for the same
    /// `(connection_id, arr_id)`. Local flags (`monitor`, `trailer_exists`)
    /// survive the refresh.
    pub async fn create_or_update_bulk(&self, items: Vec<MovieCreate>) -> AppResult<BulkOutcome> {
        for item in &items {
            item.validate()?;
        }

        let txn = self.db.begin().await?;
        match upsert_all(&txn, items).await {
            Ok(outcome) => {
                txn.commit().await?;
                debug!(created = outcome.created, updated = outcome.updated, "movies synced");
                Ok(outcome)
            },
            Err(err) => {
                txn.rollback().await?;
                warn!(error = %err, "bulk sync rolled back");
                Err(err)
            },
        }
    }

    pub async fn read(&self, id: i32) -> AppResult<Movie> {
        find_movie(&self.db, id).await.map(Movie::from)
    }

    pub async fn read_all(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn read_all_by_connection(&self, connection_id: i32) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .filter(movie::Column::ConnectionId.eq(connection_id))
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    /// Most recently added movies first.
    pub async fn read_recent(&self, limit: u64) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .order_by_desc(movie::Column::AddedAt)
            .order_by_desc(movie::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    /// Case-insensitive search over title, IMDB id, TMDB id and year.
    ///
    /// An IMDB id (`tt...`) in the query wins outright, then an exact TMDB id
    /// of at least five digits. Otherwise a plausible year is split off as a
    /// filter and the remaining text is matched as a substring.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let terms = SearchTerms::parse(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(imdb_id) = &terms.imdb_id {
            let stored = Expr::expr(Func::lower(Expr::col(movie::Column::ImdbId)));
            let rows = self.search_where(stored.eq(imdb_id.as_str())).await?;
            debug!(imdb_id = %imdb_id, results = rows.len(), "searched by imdb id");
            return Ok(rows);
        }

        if !terms.tmdb_ids.is_empty() {
            let rows =
                self.search_where(movie::Column::TmdbId.is_in(terms.tmdb_ids.clone())).await?;
            if !rows.is_empty() {
                debug!(tmdb_ids = ?terms.tmdb_ids, results = rows.len(), "searched by tmdb id");
                return Ok(rows);
            }
        }

        let condition = match (terms.text.is_empty(), terms.year) {
            (false, year) => {
                let text = Condition::any()
                    .add(lower_like(movie::Column::Title, &terms.text))
                    .add(lower_like(movie::Column::ImdbId, &terms.text))
                    .add(lower_like(movie::Column::TmdbId, &terms.text));
                let mut cond = Condition::all().add(text);
                if let Some(year) = year {
                    cond = cond.add(movie::Column::Year.eq(year));
                }
                cond
            },
            // A bare number such as "2001" may be a year or part of a title.
            (true, Some(year)) => Condition::any()
                .add(movie::Column::Year.eq(year))
                .add(lower_like(movie::Column::Title, &year.to_string())),
            (true, None) => return Ok(Vec::new()),
        };

        let rows = self.search_where(condition).await?;
        debug!(query = %query, results = rows.len(), "searched movies");
        Ok(rows)
    }

    async fn search_where(&self, cond: impl IntoCondition) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .filter(cond)
            .order_by_asc(movie::Column::Title)
            .order_by_asc(movie::Column::Id)
            .limit(SEARCH_LIMIT)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn update(&self, id: i32, changes: MovieUpdate) -> AppResult<Movie> {
        changes.validate()?;

        let existing = find_movie(&self.db, id).await?;
        let mut model: movie::ActiveModel = existing.into();

        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(year) = changes.year {
            model.year = Set(Some(year));
        }
        if let Some(imdb_id) = changes.imdb_id {
            model.imdb_id = Set(Some(imdb_id));
        }
        if let Some(tmdb_id) = changes.tmdb_id {
            model.tmdb_id = Set(Some(tmdb_id));
        }
        if let Some(overview) = changes.overview {
            model.overview = Set(Some(overview));
        }
        if let Some(runtime) = changes.runtime {
            model.runtime = Set(Some(runtime));
        }
        if let Some(trailer_id) = changes.youtube_trailer_id {
            model.youtube_trailer_id = Set(Some(trailer_id));
        }
        if let Some(folder_path) = changes.folder_path {
            model.folder_path = Set(Some(folder_path));
        }
        if let Some(poster_url) = changes.poster_url {
            model.poster_url = Set(Some(poster_url));
        }
        if let Some(fanart_url) = changes.fanart_url {
            model.fanart_url = Set(Some(fanart_url));
        }
        if let Some(trailer_exists) = changes.trailer_exists {
            model.trailer_exists = Set(trailer_exists);
        }
        if let Some(monitor) = changes.monitor {
            model.monitor = Set(monitor);
        }
        if let Some(arr_monitored) = changes.arr_monitored {
            model.arr_monitored = Set(arr_monitored);
        }
        model.updated_at = Set(now_sec());

        let row = model.update(&self.db).await?;
        debug!(movie_id = id, "movie updated");
        Ok(row.into())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let res = movie::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(AppError::movie_not_found(id));
        }
        debug!(movie_id = id, "movie deleted");
        Ok(())
    }

    /// Deletes every id or none of them. Ids are processed in ascending order,
    /// so the error names the smallest missing id.
    pub async fn delete_bulk(&self, ids: impl IntoIterator<Item = i32>) -> AppResult<u64> {
        let ids: BTreeSet<i32> = ids.into_iter().collect();

        let txn = self.db.begin().await?;
        let mut deleted = 0;
        for &id in &ids {
            let res = movie::Entity::delete_by_id(id).exec(&txn).await?;
            if res.rows_affected == 0 {
                txn.rollback().await?;
                return Err(AppError::movie_not_found(id));
            }
            deleted += res.rows_affected;
        }
        txn.commit().await?;

        debug!(count = deleted, "movies deleted in bulk");
        Ok(deleted)
    }
}

async fn find_movie<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(id).one(conn).await?.ok_or_else(|| AppError::movie_not_found(id))
}

async fn find_by_arr_id<C: ConnectionTrait>(
    conn: &C,
    connection_id: i32,
    arr_id: i32,
) -> AppResult<Option<movie::Model>> {
    Ok(movie::Entity::find()
        .filter(movie::Column::ConnectionId.eq(connection_id))
        .filter(movie::Column::ArrId.eq(arr_id))
        .one(conn)
        .await?)
}

async fn ensure_connection<C: ConnectionTrait>(conn: &C, connection_id: i32) -> AppResult<()> {
    match connection::Entity::find_by_id(connection_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::connection_not_found(connection_id)),
    }
}

async fn ensure_arr_id_free<C: ConnectionTrait>(
    conn: &C,
    connection_id: i32,
    arr_id: i32,
) -> AppResult<()> {
    match find_by_arr_id(conn, connection_id, arr_id).await? {
        Some(_) => Err(AppError::movie_exists(connection_id, arr_id)),
        None => Ok(()),
    }
}

async fn insert_movie<C: ConnectionTrait>(conn: &C, new: MovieCreate) -> AppResult<Movie> {
    let (connection_id, arr_id) = (new.connection_id, new.arr_id);
    let now = now_sec();
    let model = movie::ActiveModel {
        id: Default::default(),
        connection_id: Set(connection_id),
        arr_id: Set(arr_id),
        title: Set(new.title),
        year: Set(new.year),
        imdb_id: Set(new.imdb_id),
        tmdb_id: Set(new.tmdb_id),
        overview: Set(new.overview),
        runtime: Set(new.runtime),
        youtube_trailer_id: Set(new.youtube_trailer_id),
        folder_path: Set(new.folder_path),
        poster_url: Set(new.poster_url),
        fanart_url: Set(new.fanart_url),
        trailer_exists: Set(false),
        monitor: Set(false),
        arr_monitored: Set(new.arr_monitored),
        added_at: Set(now),
        updated_at: Set(now),
    };

    let row = model
        .insert(conn)
        .await
        .map_err(|err| AppError::from_movie_write(err, connection_id, arr_id))?;
    Ok(row.into())
}

async fn insert_all<C: ConnectionTrait>(
    conn: &C,
    items: Vec<MovieCreate>,
) -> AppResult<Vec<Movie>> {
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        ensure_connection(conn, item.connection_id).await?;
        ensure_arr_id_free(conn, item.connection_id, item.arr_id).await?;
        created.push(insert_movie(conn, item).await?);
    }
    Ok(created)
}

async fn upsert_all<C: ConnectionTrait>(
    conn: &C,
    items: Vec<MovieCreate>,
) -> AppResult<BulkOutcome> {
    let mut outcome = BulkOutcome::default();
    for item in items {
        ensure_connection(conn, item.connection_id).await?;
        match find_by_arr_id(conn, item.connection_id, item.arr_id).await? {
            Some(existing) => {
                refresh_movie(conn, existing, item).await?;
                outcome.updated += 1;
            },
            None => {
                insert_movie(conn, item).await?;
                outcome.created += 1;
            },
        }
    }
    Ok(outcome)
}

/// Overwrites the Arr-sourced fields of an existing row. Optional fields the
/// Arr did not report keep their stored value.
async fn refresh_movie<C: ConnectionTrait>(
    conn: &C,
    existing: movie::Model,
    item: MovieCreate,
) -> AppResult<()> {
    let mut model: movie::ActiveModel = existing.into();
    model.title = Set(item.title);
    model.arr_monitored = Set(item.arr_monitored);
    if item.year.is_some() {
        model.year = Set(item.year);
    }
    if item.imdb_id.is_some() {
        model.imdb_id = Set(item.imdb_id);
    }
    if item.tmdb_id.is_some() {
        model.tmdb_id = Set(item.tmdb_id);
    }
    if item.overview.is_some() {
        model.overview = Set(item.overview);
    }
    if item.runtime.is_some() {
        model.runtime = Set(item.runtime);
    }
    if item.youtube_trailer_id.is_some() {
        model.youtube_trailer_id = Set(item.youtube_trailer_id);
    }
    if item.folder_path.is_some() {
        model.folder_path = Set(item.folder_path);
    }
    if item.poster_url.is_some() {
        model.poster_url = Set(item.poster_url);
    }
    if item.fanart_url.is_some() {
        model.fanart_url = Set(item.fanart_url);
    }
    model.updated_at = Set(now_sec());
    model.update(conn).await?;
    Ok(())
}

/// `LOWER(column) LIKE '%text%'` with `%` and `_` in `text` taken literally.
/// SQLite's `LOWER` folds ASCII only, so the pattern is folded the same way.
fn lower_like(column: movie::Column, text: &str) -> SimpleExpr {
    let escaped =
        text.to_ascii_lowercase().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SearchTerms {
    imdb_id: Option<String>,
    tmdb_ids: Vec<String>,
    year: Option<i32>,
    text: String,
}

impl SearchTerms {
    fn parse(query: &str) -> Self {
        let tokens: Vec<&str> = query.split_whitespace().collect();

        let imdb_id =
            tokens.iter().find(|t| models::is_imdb_id(t)).map(|t| t.to_ascii_lowercase());

        let year_idx = tokens.iter().rposition(|t| {
            t.len() == 4 && t.parse::<i32>().is_ok_and(|y| (MIN_YEAR..=MAX_YEAR).contains(&y))
        });
        let year = year_idx.and_then(|i| tokens[i].parse().ok());

        let tmdb_ids = tokens
            .iter()
            .filter(|t| t.len() >= MIN_TMDB_TOKEN_LEN && t.chars().all(|c| c.is_ascii_digit()))
            .map(|t| t.to_string())
            .collect();

        let text = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| Some(*i) != year_idx && !models::is_imdb_id(t))
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join(" ");

        Self { imdb_id, tmdb_ids, year, text }
    }

    fn is_empty(&self) -> bool {
        self.imdb_id.is_none()
            && self.tmdb_ids.is_empty()
            && self.year.is_none()
            && self.text.is_empty()
    }
}
