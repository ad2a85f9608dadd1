//! Built-in entity repositories.
//!
//! Each constructor wires the entity's descriptor and the default
//! subscriber set onto a borrowed connection.

use crate::repo::base_repo::BaseRepository;
use crate::repo::descriptor::{
    EntityDescriptor, ACTION, AVATAR, BANNER, MEDIA, MENU, MESSAGE, MESSAGE_RECEIVE, PERMISSION,
    ROLE, USER,
};
use crate::repo::error::RepoResult;
use crate::repo::subscriber::SubscriberSet;
use crate::repo::tree_repo::TreeRepository;
use rusqlite::Connection;

fn scoped<'conn>(
    conn: &'conn Connection,
    descriptor: &'static EntityDescriptor,
) -> BaseRepository<'conn> {
    BaseRepository::new(conn, descriptor).with_subscribers(SubscriberSet::with_defaults())
}

pub fn action_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &ACTION)
}

pub fn avatar_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &AVATAR)
}

pub fn banner_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &BANNER)
}

pub fn media_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &MEDIA)
}

pub fn permission_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &PERMISSION)
}

pub fn role_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &ROLE)
}

pub fn message_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &MESSAGE)
}

pub fn message_receive_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &MESSAGE_RECEIVE)
}

pub fn user_repository(conn: &Connection) -> BaseRepository<'_> {
    scoped(conn, &USER)
}

/// Menu tree repository with the permission-name subscriber attached.
pub fn menu_repository(conn: &Connection) -> RepoResult<TreeRepository<'_>> {
    TreeRepository::try_new(scoped(conn, &MENU))
}
