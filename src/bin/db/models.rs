// Field order follows the column order of the matching select in
// generate-mirrorlist-cache.rs.

use diesel::prelude::*;

#[derive(Queryable, Debug, Clone)]
pub struct Site {
    pub id: i32,
    pub name: String,
    pub admin_active: bool,
    pub user_active: bool,
    pub private: bool,
}

#[derive(Queryable, Debug, Clone)]
pub struct Host {
    pub id: i32,
    pub site_id: i32,
    pub name: String,
    pub country: Option<String>,
    pub admin_active: bool,
    pub user_active: bool,
    pub private: bool,
    pub bandwidth_int: i32,
    pub comment: Option<String>,
}

#[derive(Queryable, Debug, Clone)]
pub struct HostCategory {
    pub id: i32,
    pub host_id: Option<i32>,
    pub category_id: Option<i32>,
    pub upstream: Option<String>,
    pub admin_active: bool,
    pub user_active: bool,
    pub always_up2date: bool,
}

#[derive(Queryable, Debug, Clone)]
pub struct HostCategoryUrl {
    pub id: i32,
    pub host_category_id: i32,
    pub url: String,
    pub private: bool,
}

#[derive(Queryable, Debug, Clone)]
pub struct Directory {
    pub id: i32,
    pub name: String,
}

#[derive(Queryable, Debug, Clone)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub product_id: Option<i32>,
    pub topdir_id: Option<i32>,
}

#[derive(Queryable, Debug, Clone)]
pub struct Product {
    pub id: i32,
    pub name: String,
}

#[derive(Queryable, Debug, Clone)]
pub struct Version {
    pub id: i32,
    pub name: String,
    pub product_id: Option<i32>,
}

#[derive(Queryable, Debug, Clone)]
pub struct Arch {
    pub id: i32,
    pub name: String,
}

#[derive(Queryable, Debug, Clone)]
pub struct Repository {
    pub id: i32,
    pub name: String,
    pub prefix: Option<String>,
    pub category_id: Option<i32>,
    pub version_id: Option<i32>,
    pub arch_id: Option<i32>,
    pub directory_id: Option<i32>,
}

#[derive(Queryable, Debug, Clone)]
pub struct NetblockCountry {
    pub netblock: String,
    pub country: String,
}
