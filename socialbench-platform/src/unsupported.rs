/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub fn get_resident_set_size() -> Option<u64> {
    None
}

pub fn get_peak_resident_set_size() -> Option<u64> {
    None
}

pub fn trim_heap() -> bool {
    false
}
