table! {
    site (id) {
        id -> Integer,
        name -> Text,
        admin_active -> Bool,
        user_active -> Bool,
        private -> Bool,
    }
}

table! {
    host (id) {
        id -> Integer,
        site_id -> Integer,
        name -> Text,
        country -> Nullable<Text>,
        admin_active -> Bool,
        user_active -> Bool,
        private -> Bool,
        bandwidth_int -> Integer,
        comment -> Nullable<Text>,
    }
}

table! {
    host_acl_ip (id) {
        id -> Integer,
        host_id -> Integer,
        ip -> Text,
    }
}

table! {
    host_netblock (id) {
        id -> Integer,
        host_id -> Integer,
        netblock -> Text,
    }
}

table! {
    host_country_allowed (id) {
        id -> Integer,
        host_id -> Integer,
        country -> Text,
    }
}

table! {
    host_category (id) {
        id -> Integer,
        host_id -> Nullable<Integer>,
        category_id -> Nullable<Integer>,
        upstream -> Nullable<Text>,
        admin_active -> Bool,
        user_active -> Bool,
        always_up2date -> Bool,
    }
}

table! {
    host_category_dir (id) {
        id -> Integer,
        host_category_id -> Integer,
        path -> Nullable<Text>,
        up2date -> Bool,
        directory_id -> Integer,
    }
}

table! {
    host_category_url (id) {
        id -> Integer,
        host_category_id -> Integer,
        url -> Text,
        private -> Bool,
    }
}

table! {
    directory (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    category (id) {
        id -> Integer,
        name -> Text,
        product_id -> Nullable<Integer>,
        topdir_id -> Nullable<Integer>,
    }
}

table! {
    category_directory (category_id, directory_id) {
        category_id -> Integer,
        directory_id -> Integer,
    }
}

table! {
    product (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    version (id) {
        id -> Integer,
        name -> Text,
        product_id -> Nullable<Integer>,
    }
}

table! {
    arch (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    repository (id) {
        id -> Integer,
        name -> Text,
        prefix -> Nullable<Text>,
        category_id -> Nullable<Integer>,
        version_id -> Nullable<Integer>,
        arch_id -> Nullable<Integer>,
        directory_id -> Nullable<Integer>,
        disabled -> Bool,
    }
}

table! {
    embargoed_country (id) {
        id -> Integer,
        country_code -> Text,
    }
}

table! {
    netblock_country (id) {
        id -> Integer,
        netblock -> Text,
        country -> Text,
    }
}
