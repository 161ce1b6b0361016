use std::time::{Duration, Instant};

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2;
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use log::{debug, info};

use crate::{
    database::{Database, DatabaseError},
    local_time,
    schema::{self, feeding_events, partitions, readings},
    sensor::{FeedingEvent, Measurements, ReadingFilter, SensorReading},
};

type DbPool = r2d2::Pool<r2d2::ConnectionManager<SqliteConnection>>;
type DbConnection = r2d2::PooledConnection<r2d2::ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const IN_MEMORY: &str = ":memory:";

#[derive(Debug)]
struct ConnectionPragmas;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(r2d2::Error::QueryError)
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    pool: DbPool
}

impl SqliteDatabase {
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_manager = r2d2::ConnectionManager::<SqliteConnection>::new(path);
        let mut builder = r2d2::Pool::builder()
            .connection_customizer(Box::new(ConnectionPragmas))
            .connection_timeout(Duration::from_secs(10));

        // Every connection to ":memory:" is its own database, so the pool must
        // hold on to exactly one connection for the lifetime of the store.
        if path == IN_MEMORY {
            builder = builder.max_size(1).idle_timeout(None).max_lifetime(None);
        }

        let db_pool = builder
            .build(db_manager)
            .map_err(|err| DatabaseError::Other(format!("Could not create database pool: {}", err)))?;

        info!("Database connected");
        {
            let mut migration_connection = db_pool.get()
                .map_err(|_| DatabaseError::Busy)?;
            let conn: &mut SqliteConnection = &mut migration_connection;
            let applied = conn.run_pending_migrations(MIGRATIONS)
                .map_err(|err| DatabaseError::Other(format!("Migration failed: {}", err)))?;
            for migration in applied {
                info!("Applied migration {}", migration);
            }
        }

        Ok(SqliteDatabase {
            pool: db_pool
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::new(IN_MEMORY)
    }

    fn connection_or_busy(&self) -> Result<DbConnection, DatabaseError> {
        self.pool.get()
            .map_err(|_| DatabaseError::Busy)
    }

    fn find_partition(conn: &mut SqliteConnection, name: &str) -> QueryResult<schema::PartitionDTO> {
        partitions::table
            .filter(partitions::name.eq(name))
            .first::<schema::PartitionDTO>(conn)
    }

    fn ensure_partition(conn: &mut SqliteConnection, name: &str) -> QueryResult<i32> {
        let created = diesel::insert_or_ignore_into(partitions::table)
            .values(schema::AddPartitionDTO { name })
            .execute(conn)?;
        if created > 0 {
            info!("Created partition {:?}", name);
        }
        Self::find_partition(conn, name).map(|dto| dto.id)
    }

    fn to_reading(dto: schema::ReadingDTO) -> SensorReading {
        SensorReading {
            device_id: dto.device_id,
            measurements: Measurements {
                turbidity: dto.turbidity,
                ph: dto.ph,
                temperature: dto.temperature,
                dissolved_oxygen: dto.dissolved_oxygen,
                conductivity: dto.conductivity,
            },
            timestamp: local_time::from_stored(dto.timestamp),
            manual: dto.manual,
        }
    }

    fn to_feeding_event(dto: schema::FeedingEventDTO) -> FeedingEvent {
        FeedingEvent {
            device_id: dto.device_id,
            event_type: dto.event_type,
            timestamp: local_time::from_stored(dto.timestamp),
        }
    }

    fn sql_error_to_db_error(err: diesel::result::Error) -> DatabaseError {
        match err {
            diesel::result::Error::NotFound => DatabaseError::NotFound,
            diesel::result::Error::AlreadyInTransaction => DatabaseError::Busy,
            diesel::result::Error::DatabaseError(_, _) => {
                let lowercase_err = err.to_string().to_lowercase();
                if lowercase_err.contains("database is locked") {
                    DatabaseError::Busy
                } else if lowercase_err.contains("unique constraint failed") {
                    DatabaseError::Conflict
                } else {
                    DatabaseError::Other(format!("{:?}", err))
                }
            },
            err => DatabaseError::Other(err.to_string())
        }
    }
}

impl Database for SqliteDatabase {
    type PartitionHandle = i32;

    fn route_for_write(&self, name: &str) -> Result<Self::PartitionHandle, DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        Self::ensure_partition(&mut conn, name)
            .map_err(Self::sql_error_to_db_error)
    }

    fn route_for_read(&self, name: &str) -> Result<Self::PartitionHandle, DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        Self::find_partition(&mut conn, name)
            .map(|dto| dto.id)
            .map_err(Self::sql_error_to_db_error)
    }

    fn get_partitions(&self) -> Result<Vec<String>, DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        partitions::table
            .select(partitions::name)
            .order_by(partitions::name.asc())
            .load::<String>(&mut conn)
            .map_err(Self::sql_error_to_db_error)
    }

    fn add_reading(&self, name: &str, reading: &SensorReading) -> Result<(), DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        let m = &reading.measurements;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let partition_id = Self::ensure_partition(conn, name)?;
            diesel::insert_into(readings::table)
                .values(schema::AddReadingDTO {
                    partition_id,
                    device_id: &reading.device_id,
                    turbidity: m.turbidity,
                    ph: m.ph,
                    temperature: m.temperature,
                    dissolved_oxygen: m.dissolved_oxygen,
                    conductivity: m.conductivity,
                    timestamp: reading.timestamp.naive_utc(),
                    manual: reading.manual,
                })
                .execute(conn)
        })
        .map_err(Self::sql_error_to_db_error)
        .map(|inserts| debug_assert!(inserts == 1))
    }

    fn get_readings(&self, handle: &Self::PartitionHandle, filter: &ReadingFilter)
        -> Result<Vec<SensorReading>, DatabaseError> {

        let before_db = Instant::now();
        let mut conn = self.connection_or_busy()?;

        let mut query = readings::table
            .filter(readings::partition_id.eq(*handle))
            .into_boxed::<Sqlite>();
        if let Some(device_id) = &filter.device_id {
            query = query.filter(readings::device_id.eq(device_id.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(readings::timestamp.ge(from.naive_utc()));
        }
        if let Some(to) = filter.to {
            query = query.filter(readings::timestamp.le(to.naive_utc()));
        }

        let rows = query
            .order_by((readings::timestamp.desc(), readings::id.desc()))
            .limit(filter.limit)
            .load::<schema::ReadingDTO>(&mut conn)
            .map_err(Self::sql_error_to_db_error)?;

        debug!("Loading {} readings took {}ms", rows.len(), before_db.elapsed().as_millis());

        Ok(rows.into_iter().map(Self::to_reading).collect())
    }

    fn clear_partition(&self, name: &str) -> Result<usize, DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        let partition = match Self::find_partition(&mut conn, name) {
            Ok(dto) => dto,
            Err(diesel::result::Error::NotFound) => return Ok(0),
            Err(err) => return Err(Self::sql_error_to_db_error(err)),
        };

        diesel::delete(readings::table.filter(readings::partition_id.eq(partition.id)))
            .execute(&mut conn)
            .map_err(Self::sql_error_to_db_error)
    }

    fn add_feeding_event(&self, event: &FeedingEvent) -> Result<(), DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        diesel::insert_into(feeding_events::table)
            .values(schema::AddFeedingEventDTO {
                device_id: &event.device_id,
                event_type: &event.event_type,
                timestamp: event.timestamp.naive_utc(),
            })
            .execute(&mut conn)
            .map_err(Self::sql_error_to_db_error)
            .map(|inserts| debug_assert!(inserts == 1))
    }

    fn get_feeding_events(&self, limit: i64) -> Result<Vec<FeedingEvent>, DatabaseError> {
        let mut conn = self.connection_or_busy()?;
        feeding_events::table
            .order_by((feeding_events::timestamp.desc(), feeding_events::id.desc()))
            .limit(limit)
            .load::<schema::FeedingEventDTO>(&mut conn)
            .map_err(Self::sql_error_to_db_error)
            .map(|rows| rows.into_iter().map(Self::to_feeding_event).collect())
    }
}
